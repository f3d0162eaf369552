use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{
    entities::contact::TemplateParams,
    errors::EmailError,
    repositories::email::EmailSender,
    settings::AppConfig,
};

/// Body accepted by the EmailJS `email/send` endpoint.
#[derive(Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub service_id: &'a str,
    pub template_id: &'a str,
    /// EmailJS calls the public key `user_id`.
    #[serde(rename = "user_id")]
    pub public_key: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<&'a str>,
    pub template_params: &'a TemplateParams,
}

#[derive(Clone)]
pub struct EmailJsClient {
    http: Client,
    api_url: String,
    service_id: String,
    template_id: String,
    public_key: String,
    access_token: Option<String>,
}

impl EmailJsClient {
    pub fn new(config: &AppConfig) -> Self {
        EmailJsClient {
            http: Client::new(),
            api_url: config.emailjs_api_url.clone(),
            service_id: config.emailjs_service_id.clone(),
            template_id: config.emailjs_template_id.clone(),
            public_key: config.emailjs_public_key.clone(),
            access_token: config.emailjs_access_token.clone(),
        }
    }

    pub fn request<'a>(&'a self, params: &'a TemplateParams) -> EmailRequest<'a> {
        EmailRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            public_key: &self.public_key,
            access_token: self.access_token.as_deref(),
            template_params: params,
        }
    }
}

#[async_trait]
impl EmailSender for EmailJsClient {
    async fn send(&self, params: &TemplateParams) -> Result<(), EmailError> {
        let response = self
            .http
            .post(&self.api_url)
            .json(&self.request(params))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("EmailJS rejected message: {} {}", status, body);
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_emailjs_field_names() {
        let client = EmailJsClient {
            http: Client::new(),
            api_url: "https://api.emailjs.com/api/v1.0/email/send".into(),
            service_id: "service_x".into(),
            template_id: "template_y".into(),
            public_key: "pk_z".into(),
            access_token: None,
        };
        let params = TemplateParams {
            from_name: "Jane Doe".into(),
            from_email: "jane@example.com".into(),
            subject: "Project inquiry".into(),
            message: "Hello there, let's talk.".into(),
            to_email: "me@example.com".into(),
            reply_to: "jane@example.com".into(),
        };

        let json = serde_json::to_value(client.request(&params)).unwrap();
        assert_eq!(json["service_id"], "service_x");
        assert_eq!(json["template_id"], "template_y");
        assert_eq!(json["user_id"], "pk_z");
        assert!(json.get("accessToken").is_none());
        assert_eq!(json["template_params"]["reply_to"], "jane@example.com");
    }
}
