use serde::{Deserialize, Serialize};

/// Single-use anti-replay credential kept per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfToken {
    pub token: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub used: bool,
}

impl CsrfToken {
    pub fn new(token: String, now: i64, ttl_ms: i64) -> Self {
        CsrfToken {
            token,
            created_at: now,
            expires_at: now + ttl_ms,
            used: false,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_valid(&self, now: i64) -> bool {
        !self.used && !self.is_expired(now)
    }
}

/// Returned when a contact form is rendered.
#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    pub session_id: String,
    pub rendered_at: i64,
}
