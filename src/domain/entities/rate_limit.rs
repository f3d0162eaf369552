use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterType {
    ContactForm,
    Email,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    pub window_ms: i64,
    pub max_attempts: u32,
    pub block_duration_ms: i64,
}

const MINUTE_MS: i64 = 60 * 1000;

impl LimiterType {
    pub const ALL: [LimiterType; 3] = [LimiterType::ContactForm, LimiterType::Email, LimiterType::Api];

    /// Inverse of [`LimiterType::as_str`].
    pub fn parse(name: &str) -> Option<LimiterType> {
        Self::ALL.into_iter().find(|limiter| limiter.as_str() == name)
    }

    pub fn config(&self) -> LimiterConfig {
        match self {
            LimiterType::ContactForm => LimiterConfig {
                window_ms: 15 * MINUTE_MS,
                max_attempts: 5,
                block_duration_ms: 60 * MINUTE_MS,
            },
            LimiterType::Email => LimiterConfig {
                window_ms: 60 * MINUTE_MS,
                max_attempts: 3,
                block_duration_ms: 60 * MINUTE_MS,
            },
            LimiterType::Api => LimiterConfig {
                window_ms: MINUTE_MS,
                max_attempts: 60,
                block_duration_ms: 5 * MINUTE_MS,
            },
        }
    }

    /// Only the contact form limiter clears its counter on success.
    pub fn resets_on_success(&self) -> bool {
        matches!(self, LimiterType::ContactForm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterType::ContactForm => "contact_form",
            LimiterType::Email => "email",
            LimiterType::Api => "api",
        }
    }
}

impl fmt::Display for LimiterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted throttling record for one identifier and limiter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    pub attempts: u32,
    pub first_attempt: i64,
    pub last_attempt: i64,
    pub blocked: bool,
    pub block_until: Option<i64>,
}

impl RateLimitState {
    pub fn fresh(now: i64) -> Self {
        RateLimitState {
            attempts: 0,
            first_attempt: now,
            last_attempt: now,
            blocked: false,
            block_until: None,
        }
    }

    pub fn is_blocked_at(&self, now: i64) -> bool {
        self.blocked && self.block_until.is_some_and(|until| now < until)
    }

    pub fn window_elapsed(&self, now: i64, window_ms: i64) -> bool {
        now.saturating_sub(self.first_attempt) > window_ms
    }

    /// Neither blocking nor counting anymore; safe to forget.
    pub fn is_stale(&self, now: i64, window_ms: i64) -> bool {
        !self.is_blocked_at(now) && self.window_elapsed(now, window_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the caller may try again.
    pub reset_time: i64,
    pub blocked: bool,
}

impl RateLimitResult {
    pub fn fresh(now: i64, config: &LimiterConfig) -> Self {
        RateLimitResult {
            allowed: true,
            remaining: config.max_attempts,
            reset_time: now + config.window_ms,
            blocked: false,
        }
    }

    pub fn from_state(state: &RateLimitState, now: i64, config: &LimiterConfig) -> Self {
        if state.is_blocked_at(now) {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_time: state.block_until.unwrap_or(now),
                blocked: true,
            };
        }

        RateLimitResult {
            allowed: state.attempts < config.max_attempts,
            remaining: config.max_attempts.saturating_sub(state.attempts),
            reset_time: state.first_attempt + config.window_ms,
            blocked: false,
        }
    }

    /// User-facing retry message, rounded up to whole minutes.
    pub fn message(&self, now: i64) -> String {
        let wait_ms = (self.reset_time - now).max(0);
        let minutes = ((wait_ms + 59_999) / 60_000).max(1);
        let unit = if minutes == 1 { "minute" } else { "minutes" };

        if self.blocked {
            format!("Too many attempts. Please try again in {} {}.", minutes, unit)
        } else {
            format!(
                "Rate limit exceeded. You can try again in {} {}.",
                minutes, unit
            )
        }
    }
}
