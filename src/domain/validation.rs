//! Per-field shape rules for contact submissions.
//!
//! These checks bound length and character classes. The pattern blocklist is a
//! second layer only; it does not make a value safe to render. Output must
//! still be escaped for its rendering context.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError};

use crate::{
    constants::MAX_MESSAGE_LENGTH,
    entities::contact::ContactSubmission,
    errors::{ContactError, FieldError},
};

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LENGTH: usize = 254;
const MIN_SUBJECT_LENGTH: usize = 3;
const MAX_SUBJECT_LENGTH: usize = 100;
const MIN_MESSAGE_LENGTH: usize = 10;

/// Letters from any script (accented forms included), spaces, hyphens,
/// apostrophes and periods.
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{M}\s'.\-]+$").expect("valid name regex")
});

/// RFC 5322 lite: permissive local part, label-based domain with a TLD.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("valid email regex")
});

static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<\s*/?\s*script",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)\bon[a-z]+\s*=",
        r"<[^>]*>",
        r"\{\{|\}\}|\$\{",
        r"(?i)&#x?[0-9a-f]+;?",
        r"(?i)%3[ce]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid suspicious pattern"))
    .collect()
});

static SUBJECT_FORBIDDEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[<>{}]").expect("valid subject regex")
});

static MESSAGE_FORBIDDEN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"<[^>]*>",
        r"(?i)<\s*/?\s*script",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)\beval\s*\(",
        r"(?i)\bon(load|error|click|mouseover|focus|blur|submit|change|keydown|keyup)\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid message pattern"))
    .collect()
});

fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn is_suspicious(value: &str) -> bool {
    SUSPICIOUS_PATTERNS.iter().any(|re| re.is_match(value))
}

fn check_length(
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length == 0 {
        return Err(field_error("required", format!("{} is required", label)));
    }
    if length < min {
        return Err(field_error(
            "length",
            format!("{} must be at least {} characters", label, min),
        ));
    }
    if length > max {
        return Err(field_error(
            "length",
            format!("{} must be at most {} characters", label, max),
        ));
    }
    Ok(())
}

pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    check_length("Name", trimmed, MIN_NAME_LENGTH, MAX_NAME_LENGTH)?;

    if !NAME_RE.is_match(trimmed) {
        return Err(field_error(
            "name_characters",
            "Name can only contain letters, spaces, hyphens, apostrophes, and periods".into(),
        ));
    }
    if is_suspicious(trimmed) {
        return Err(field_error("suspicious", "Name contains invalid content".into()));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    // A space anywhere is invalid, never silently stripped.
    if value.chars().any(char::is_whitespace) && !value.trim().is_empty() {
        return Err(field_error("email_spaces", "Email cannot contain spaces".into()));
    }

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(field_error("required", "Email is required".into()));
    }

    let length = trimmed.chars().count();
    if !(MIN_EMAIL_LENGTH..=MAX_EMAIL_LENGTH).contains(&length) {
        return Err(field_error(
            "length",
            format!(
                "Email must be between {} and {} characters",
                MIN_EMAIL_LENGTH, MAX_EMAIL_LENGTH
            ),
        ));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(field_error("email_format", "Please enter a valid email address".into()));
    }
    if is_suspicious(trimmed) {
        return Err(field_error("suspicious", "Email contains invalid content".into()));
    }
    Ok(())
}

pub fn validate_subject(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    check_length("Subject", trimmed, MIN_SUBJECT_LENGTH, MAX_SUBJECT_LENGTH)?;

    if SUBJECT_FORBIDDEN_RE.is_match(trimmed) || is_suspicious(trimmed) {
        return Err(field_error("suspicious", "Subject contains invalid characters".into()));
    }
    Ok(())
}

pub fn validate_message(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    check_length("Message", trimmed, MIN_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH)?;

    if MESSAGE_FORBIDDEN_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return Err(field_error("suspicious", "Message contains invalid content".into()));
    }
    Ok(())
}

/// Validates a single named field, returning its error message if any.
/// Unknown field names are never in error.
pub fn validate_field(field: &str, value: &str) -> Option<String> {
    let result = match field {
        "name" => validate_name(value),
        "email" => validate_email(value),
        "subject" => validate_subject(value),
        "message" => validate_message(value),
        _ => Ok(()),
    };

    result.err().map(|e| {
        e.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid value".to_string())
    })
}

/// Validates every field, returning errors in form order.
pub fn validate_all(submission: &ContactSubmission) -> Vec<FieldError> {
    match submission.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => match ContactError::from(errors) {
            ContactError::ValidationError(details) => details,
            _ => Vec::new(),
        },
    }
}
