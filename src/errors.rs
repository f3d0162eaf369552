use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

use crate::entities::contact::Notification;

/// Field order used when reporting validation failures.
pub const CONTACT_FIELDS: [&str; 4] = ["name", "email", "subject", "message"];

#[derive(Debug)]
pub enum ContactError {
    ValidationError(Vec<FieldError>),
    RateLimited { message: String, reset_time: i64, blocked: bool },
    SubmissionRejected,
    SubmittedTooQuickly,
    InvalidCsrfToken,
    Transport(String),
    Storage(String),
}

impl fmt::Display for ContactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            ContactError::RateLimited { message, .. } => write!(f, "{}", message),
            ContactError::SubmissionRejected => {
                write!(f, "Unable to send your message. Please try again later.")
            }
            ContactError::SubmittedTooQuickly => {
                write!(f, "Please take a moment to review your message before sending.")
            }
            ContactError::InvalidCsrfToken => {
                write!(f, "Your security token has expired. Please refresh the page and try again.")
            }
            ContactError::Transport(_) => {
                write!(f, "Failed to send your message. Please try again or contact me directly via email.")
            }
            ContactError::Storage(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl ContactError {
    /// Short machine-readable label used in JSON bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ContactError::ValidationError(_) => "validation_error",
            ContactError::RateLimited { .. } => "rate_limited",
            ContactError::SubmissionRejected => "submission_rejected",
            ContactError::SubmittedTooQuickly => "submitted_too_quickly",
            ContactError::InvalidCsrfToken => "invalid_csrf_token",
            ContactError::Transport(_) => "transport_error",
            ContactError::Storage(_) => "internal_server_error",
        }
    }

    /// Toast shown to the user for this failure.
    pub fn notification(&self) -> Notification {
        match self {
            ContactError::ValidationError(_) => Notification::error(
                "Validation Error",
                "Please correct the highlighted fields and try again.",
            ),
            ContactError::RateLimited { message, .. } => {
                Notification::error("Too Many Attempts", message)
            }
            ContactError::Storage(_) => Notification::error(
                "Error",
                "Something went wrong on our side. Please try again later.",
            ),
            _ => Notification::error("Error", &self.to_string()),
        }
    }
}

impl ResponseError for ContactError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ContactError::ValidationError(errors) => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": "Validation failed",
                    "details": errors,
                    "notification": self.notification(),
                })
            }
            ContactError::RateLimited { reset_time, blocked, .. } => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": self.to_string(),
                    "reset_time": reset_time,
                    "blocked": blocked,
                    "notification": self.notification(),
                })
            }
            ContactError::Storage(_) => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": "Internal server error",
                    "notification": self.notification(),
                })
            }
            _ => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": self.to_string(),
                    "notification": self.notification(),
                })
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ContactError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ContactError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ContactError::SubmissionRejected => StatusCode::BAD_REQUEST,
            ContactError::SubmittedTooQuickly => StatusCode::TOO_MANY_REQUESTS,
            ContactError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            ContactError::Transport(_) => StatusCode::BAD_GATEWAY,
            ContactError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ContactError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors.field_errors();

        let mut details: Vec<FieldError> = field_errors
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().take(1).map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        details.sort_by_key(|e| {
            CONTACT_FIELDS
                .iter()
                .position(|f| *f == e.field)
                .unwrap_or(CONTACT_FIELDS.len())
        });

        ContactError::ValidationError(details)
    }
}

impl From<StorageError> for ContactError {
    fn from(err: StorageError) -> Self {
        ContactError::Storage(err.to_string())
    }
}

impl From<EmailError> for ContactError {
    fn from(err: EmailError) -> Self {
        ContactError::Transport(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum StorageError {
    #[display("Storage connection failed: {_0}")]
    Connection(String),

    #[display("Storage operation failed: {_0}")]
    Operation(String),

    #[display("Stored value could not be (de)serialized: {_0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StorageError::Connection(err.to_string())
        } else {
            StorageError::Operation(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum EmailError {
    #[display("Email request failed: {_0}")]
    Request(String),

    #[display("Email service rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Request(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
