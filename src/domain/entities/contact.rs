use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    constants::{ERROR_TOAST_DURATION_MS, SUCCESS_TOAST_DURATION_MS},
    domain::validation::{validate_email, validate_message, validate_name, validate_subject},
};

/// Contact form state as posted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,

    /// Hidden field; humans leave it empty.
    #[serde(default)]
    pub honeypot: String,

    /// Epoch milliseconds captured when the form was rendered.
    pub timestamp: i64,

    #[serde(default)]
    pub csrf_token: String,
}

/// The value checked by the guard pipeline. Lives for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ContactSubmission {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(custom(function = "validate_email"))]
    pub email: String,

    #[validate(custom(function = "validate_subject"))]
    pub subject: String,

    #[validate(custom(function = "validate_message"))]
    pub message: String,

    pub honeypot: String,
    pub timestamp: i64,
    pub csrf_token: String,
}

impl ContactSubmission {
    /// Merges form state with the token the server is about to check.
    pub fn from_form(form: ContactForm, csrf_token: String) -> Self {
        ContactSubmission {
            name: form.name,
            email: form.email,
            subject: form.subject,
            message: form.message,
            honeypot: form.honeypot,
            timestamp: form.timestamp,
            csrf_token,
        }
    }

    /// Text fields joined for content scanning.
    pub fn combined_text(&self) -> String {
        format!("{} {} {} {}", self.name, self.email, self.subject, self.message)
    }
}

/// Parameters handed to the email template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TemplateParams {
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub message: String,
    pub to_email: String,
    pub reply_to: String,
}

impl TemplateParams {
    pub fn new(submission: &ContactSubmission, to_email: &str) -> Self {
        TemplateParams {
            from_name: submission.name.clone(),
            from_email: submission.email.clone(),
            subject: submission.subject.clone(),
            message: submission.message.clone(),
            to_email: to_email.to_string(),
            reply_to: submission.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Toast payload returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub duration: u64,
}

impl Notification {
    pub fn success(title: &str, message: &str) -> Self {
        Notification {
            kind: NotificationKind::Success,
            title: title.to_string(),
            message: message.to_string(),
            duration: SUCCESS_TOAST_DURATION_MS,
        }
    }

    pub fn error(title: &str, message: &str) -> Self {
        Notification {
            kind: NotificationKind::Error,
            title: title.to_string(),
            message: message.to_string(),
            duration: ERROR_TOAST_DURATION_MS,
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub notification: Notification,
    /// Fresh token for the next submission from the same session.
    pub csrf_token: String,
}
