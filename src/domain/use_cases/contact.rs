use std::sync::Arc;

use crate::{
    constants::MIN_SUBMIT_ELAPSED_MS,
    domain::{
        bot_detection::detect_bot,
        sanitize::sanitize_submission,
        validation::validate_all,
    },
    entities::{
        contact::{ContactForm, ContactSubmission, Notification, SubmissionOutcome, TemplateParams},
        rate_limit::LimiterType,
    },
    errors::ContactError,
    limiter::rate_limiter::RateLimiter,
    csrf::token_manager::CsrfTokenManager,
    repositories::email::EmailSender,
    utils::clock::SharedClock,
};

#[derive(Debug, Clone)]
pub struct ContactSettings {
    /// Recipient of contact messages.
    pub to_email: String,
    /// Adopt the session's current token when the submitted one is stale.
    pub refresh_stale_tokens: bool,
    /// Minimum time between render and dispatch.
    pub min_elapsed_ms: i64,
}

impl ContactSettings {
    pub fn new(to_email: &str, refresh_stale_tokens: bool) -> Self {
        ContactSettings {
            to_email: to_email.to_string(),
            refresh_stale_tokens,
            min_elapsed_ms: MIN_SUBMIT_ELAPSED_MS,
        }
    }
}

/// Runs a contact submission through the guard pipeline and dispatches it.
pub struct ContactHandler<E>
where
    E: EmailSender,
{
    pub rate_limiter: Arc<RateLimiter>,
    pub csrf_manager: Arc<CsrfTokenManager>,
    pub email_sender: E,
    clock: SharedClock,
    settings: ContactSettings,
}

impl<E> ContactHandler<E>
where
    E: EmailSender,
{
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        csrf_manager: Arc<CsrfTokenManager>,
        email_sender: E,
        clock: SharedClock,
        settings: ContactSettings,
    ) -> Self {
        ContactHandler {
            rate_limiter,
            csrf_manager,
            email_sender,
            clock,
            settings,
        }
    }

    /// Token for a newly rendered form. Renders count against the client's
    /// API budget since each one may create a session record.
    pub async fn render_token(
        &self,
        identifier: &str,
        session_id: &str,
    ) -> Result<(String, i64), ContactError> {
        let limit = self.rate_limiter.check(identifier, LimiterType::Api).await?;
        if !limit.allowed {
            tracing::warn!("Token render rate limited for {}", identifier);
            return Err(ContactError::RateLimited {
                message: limit.message(self.clock.now_ms()),
                reset_time: limit.reset_time,
                blocked: limit.blocked,
            });
        }
        self.rate_limiter
            .record_attempt(identifier, LimiterType::Api, false)
            .await?;

        let token = self.csrf_manager.get_current_token(session_id).await?;
        Ok((token, self.clock.now_ms()))
    }

    /// Checks run in a fixed order and stop at the first failure:
    /// rate limit, bot heuristics, field shape, CSRF token, elapsed time.
    /// Only the dispatch step writes limiter or token state.
    pub async fn submit(
        &self,
        identifier: &str,
        session_id: &str,
        form: ContactForm,
    ) -> Result<SubmissionOutcome, ContactError> {
        let limit = self.rate_limiter.check(identifier, LimiterType::ContactForm).await?;
        if !limit.allowed {
            let now = self.clock.now_ms();
            tracing::warn!("Contact submission rate limited for {}", identifier);
            return Err(ContactError::RateLimited {
                message: limit.message(now),
                reset_time: limit.reset_time,
                blocked: limit.blocked,
            });
        }

        let held_token = form.csrf_token.clone();
        let mut submission = ContactSubmission::from_form(form, held_token);

        if let Some(signal) = detect_bot(&submission, self.clock.now_ms()) {
            tracing::warn!("Contact submission from {} rejected: {}", identifier, signal);
            return Err(ContactError::SubmissionRejected);
        }

        let field_errors = validate_all(&submission);
        if !field_errors.is_empty() {
            return Err(ContactError::ValidationError(field_errors));
        }

        submission.csrf_token = self.ensure_valid_token(session_id, submission.csrf_token).await?;

        if self.clock.now_ms().saturating_sub(submission.timestamp) < self.settings.min_elapsed_ms {
            return Err(ContactError::SubmittedTooQuickly);
        }

        self.dispatch(identifier, session_id, &submission).await
    }

    /// Returns a token that currently validates for the session.
    async fn ensure_valid_token(&self, session_id: &str, held: String) -> Result<String, ContactError> {
        if self.csrf_manager.is_token_valid(session_id, &held).await? {
            return Ok(held);
        }
        if !self.settings.refresh_stale_tokens {
            return Err(ContactError::InvalidCsrfToken);
        }

        tracing::debug!("Stale CSRF token for session {}, refreshing", session_id);
        let refreshed = self.csrf_manager.get_current_token(session_id).await?;
        if self.csrf_manager.is_token_valid(session_id, &refreshed).await? {
            Ok(refreshed)
        } else {
            Err(ContactError::InvalidCsrfToken)
        }
    }

    async fn dispatch(
        &self,
        identifier: &str,
        session_id: &str,
        submission: &ContactSubmission,
    ) -> Result<SubmissionOutcome, ContactError> {
        if !self.csrf_manager.validate_token(session_id, &submission.csrf_token).await? {
            return Err(ContactError::InvalidCsrfToken);
        }

        self.rate_limiter
            .record_attempt(identifier, LimiterType::ContactForm, false)
            .await?;

        let clean = sanitize_submission(submission);
        let params = TemplateParams::new(&clean, &self.settings.to_email);

        match self.email_sender.send(&params).await {
            Ok(()) => {
                self.rate_limiter
                    .record_attempt(identifier, LimiterType::ContactForm, true)
                    .await?;
                let next_token = self.csrf_manager.refresh_token(session_id).await?;

                tracing::info!("Contact message from {} dispatched", identifier);
                Ok(SubmissionOutcome {
                    notification: Notification::success(
                        "Message Sent!",
                        "Thank you for reaching out. I'll get back to you soon.",
                    ),
                    csrf_token: next_token,
                })
            }
            Err(e) => {
                tracing::error!("Failed to dispatch contact message from {}: {}", identifier, e);
                Err(ContactError::from(e))
            }
        }
    }
}
