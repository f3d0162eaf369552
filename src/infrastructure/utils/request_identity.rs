use actix_web::HttpRequest;

use crate::constants::SESSION_HEADER;

const MAX_SESSION_ID_LENGTH: usize = 128;

/// Rate-limit identifier for a request: the client IP.
///
/// `X-Forwarded-For` is only honoured when the service sits behind a trusted
/// proxy; otherwise any client could pick its own identifier.
pub fn client_identifier(req: &HttpRequest, trust_x_forwarded_for: bool) -> String {
    if trust_x_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|first_hop| !first_hop.is_empty());

        if let Some(first_hop) = forwarded {
            return first_hop.to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Session id sent by the client, if present and well-formed.
pub fn session_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| is_well_formed_session_id(id))
        .map(str::to_string)
}

fn is_well_formed_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
