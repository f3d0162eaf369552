//! Denylist sanitizer for free-text contact fields.
//!
//! Strips angle brackets, script-capable URL schemes and inline event
//! handlers. This is input hygiene only; rendering code must still escape.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::{MAX_EMAIL_LENGTH, MAX_INPUT_LENGTH, MAX_MESSAGE_LENGTH},
    entities::contact::ContactSubmission,
};

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[<>]",
        r"(?i)javascript\s*:",
        r"(?i)data\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)\bon\w+\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid sanitizer pattern"))
    .collect()
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

fn strip_dangerous(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    // Removing one pattern can splice together another ("java<script:"),
    // so repeat until nothing changes.
    loop {
        let before = cleaned.len();
        for re in DANGEROUS_PATTERNS.iter() {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
        if cleaned.len() == before {
            return cleaned;
        }
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn sanitize_capped(raw: &str, max: usize) -> String {
    let cleaned = strip_dangerous(raw);
    truncate_chars(cleaned.trim(), max)
}

/// Sanitizes a generic text field.
pub fn sanitize_input(raw: &str) -> String {
    sanitize_capped(raw, MAX_INPUT_LENGTH)
}

/// Sanitizes the message body, capped at the same length validation accepts.
pub fn sanitize_message(raw: &str) -> String {
    sanitize_capped(raw, MAX_MESSAGE_LENGTH)
}

/// Sanitizes an email address; the result never contains whitespace.
pub fn sanitize_email(raw: &str) -> String {
    let cleaned = strip_dangerous(raw);
    let compact = WHITESPACE_RE.replace_all(&cleaned, "");
    truncate_chars(&compact, MAX_EMAIL_LENGTH)
}

/// Sanitized copy of a submission, ready for dispatch.
pub fn sanitize_submission(submission: &ContactSubmission) -> ContactSubmission {
    ContactSubmission {
        name: sanitize_input(&submission.name),
        email: sanitize_email(&submission.email),
        subject: sanitize_input(&submission.subject),
        message: sanitize_message(&submission.message),
        honeypot: submission.honeypot.clone(),
        timestamp: submission.timestamp,
        csrf_token: submission.csrf_token.clone(),
    }
}
