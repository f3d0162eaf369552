use std::sync::Arc;

use async_trait::async_trait;

use crate::{entities::contact::TemplateParams, errors::EmailError};

/// Delivers an accepted contact message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Resolves once the provider accepted the message.
    async fn send(&self, params: &TemplateParams) -> Result<(), EmailError>;
}

#[async_trait]
impl<T> EmailSender for Arc<T>
where
    T: EmailSender + ?Sized,
{
    async fn send(&self, params: &TemplateParams) -> Result<(), EmailError> {
        (**self).send(params).await
    }
}
