use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

// ───── Bot detection & submit timing ─────────────────────────────────
/// Fastest plausible human fill time, measured from form render.
pub const MIN_FILL_TIME_MS: i64 = 3_000;
/// Second elapsed-time guard applied by the orchestrator after CSRF checks.
pub const MIN_SUBMIT_ELAPSED_MS: i64 = 3_000;
/// Render timestamps older than this are not trusted.
pub const MAX_FORM_AGE_MS: i64 = 24 * 60 * 60 * 1000;

// ───── CSRF tokens ───────────────────────────────────────────────────
pub const CSRF_TOKEN_BYTES: usize = 32;
pub const CSRF_TOKEN_TTL_MS: i64 = 30 * 60 * 1000;
pub const CSRF_MAX_TOKENS_PER_SESSION: usize = 5;
/// Period of the CSRF token and rate limit record sweep.
pub const CSRF_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
pub const CSRF_KEY_PREFIX: &str = "csrf_tokens:";

// ───── Rate limiting ─────────────────────────────────────────────────
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit:";

// ───── Sanitizer limits ──────────────────────────────────────────────
pub const MAX_INPUT_LENGTH: usize = 1000;
pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_EMAIL_LENGTH: usize = 254;

// ───── Request bodies ────────────────────────────────────────────────
/// Widest JSON encoding of one character: a `\uXXXX\uXXXX` surrogate pair.
pub const MAX_JSON_ESCAPE_WIDTH: usize = 12;
/// Fits a maximal form (message plus three short fields) with every
/// character escaped, plus room for keys, token and timestamp.
pub const MAX_JSON_PAYLOAD: usize =
    (MAX_MESSAGE_LENGTH + 3 * MAX_INPUT_LENGTH) * MAX_JSON_ESCAPE_WIDTH + 4 * 1024;

// ───── Notifications ─────────────────────────────────────────────────
pub const SUCCESS_TOAST_DURATION_MS: u64 = 5_000;
pub const ERROR_TOAST_DURATION_MS: u64 = 7_000;

pub const SESSION_HEADER: &str = "X-Session-Id";
