use std::{env, fmt, str::FromStr};

use config::{Config, ConfigError, Environment, File};
use derive_more::Display;
use dotenv::dotenv;
use serde::Deserialize;
use url::Url;
use validator::ValidateEmail;

#[derive(Debug, Display, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[display("development")]
    Development,
    #[display("production")]
    Production,
    #[display("testing")]
    Testing,
}

impl AppEnvironment {
    const ALL: [AppEnvironment; 3] = [
        AppEnvironment::Development,
        AppEnvironment::Production,
        AppEnvironment::Testing,
    ];
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.to_string() == wanted)
            .ok_or_else(|| ConfigError::Message(format!("Invalid APP_ENV value: {raw}")))
    }
}

mod defaults {
    use super::AppEnvironment;

    pub fn env() -> AppEnvironment {
        AppEnvironment::Development
    }
    pub fn name() -> String {
        "Portfolio-Contact".into()
    }
    pub fn host() -> String {
        "127.0.0.1".into()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn workers() -> usize {
        num_cpus::get()
    }
    pub fn cors() -> Vec<String> {
        vec!["*".into()]
    }
    pub fn emailjs_api_url() -> String {
        "https://api.emailjs.com/api/v1.0/email/send".into()
    }
    pub fn enabled() -> bool {
        true
    }
}

/// Service configuration. Every field can be set as `APP_<FIELD>`.
#[derive(Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "defaults::env")]
    pub env: AppEnvironment,
    /// Also used as the Redis key namespace.
    #[serde(default = "defaults::name")]
    pub name: String,
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default = "defaults::workers")]
    pub worker_count: usize,

    #[serde(default)]
    pub redis_url: Option<String>,

    /// Comma separated when given through the environment.
    #[serde(default = "defaults::cors")]
    pub cors_allowed_origins: Vec<String>,
    /// Use the first `X-Forwarded-For` hop as client identity.
    #[serde(default)]
    pub trust_x_forwarded_for: bool,

    #[serde(default = "defaults::emailjs_api_url")]
    pub emailjs_api_url: String,
    #[serde(default)]
    pub emailjs_service_id: String,
    #[serde(default)]
    pub emailjs_template_id: String,
    #[serde(default)]
    pub emailjs_public_key: String,
    #[serde(default)]
    pub emailjs_access_token: Option<String>,
    #[serde(default)]
    pub contact_to_email: String,

    /// Re-issue a session token when the submitted one is stale instead of
    /// rejecting the submission outright.
    #[serde(default = "defaults::enabled")]
    pub csrf_auto_refresh: bool,
}

impl AppConfig {
    /// Layers `config/default`, `config/<APP_ENV>` and `APP_*` variables (with
    /// `.env` loaded first), then validates the result.
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let env_name = match env::var("APP_ENV") {
            Ok(raw) => raw.parse::<AppEnvironment>()?,
            Err(_) => defaults::env(),
        };

        let mut config: AppConfig = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env_name}")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .ignore_empty(true),
            )
            .build()?
            .try_deserialize()?;

        config.env = env_name;
        config.validate()?;
        Ok(config)
    }

    /// Reports every problem at once rather than the first one found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("APP_EMAILJS_SERVICE_ID", &self.emailjs_service_id),
            ("APP_EMAILJS_TEMPLATE_ID", &self.emailjs_template_id),
            ("APP_EMAILJS_PUBLIC_KEY", &self.emailjs_public_key),
        ];

        let mut problems: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| format!("{key} must be set"))
            .collect();

        if !self.contact_to_email.validate_email() {
            problems.push("APP_CONTACT_TO_EMAIL must be a valid email address".into());
        }
        if let Err(e) = Url::parse(&self.emailjs_api_url) {
            problems.push(format!("APP_EMAILJS_API_URL is not a valid URL ({e})"));
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            problems.push("wildcard CORS origin is not allowed in production".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(problems.join("; ")))
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.env, AppEnvironment::Production)
    }

    /// Allowed origins with list entries split on commas and blanks dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins = Vec::new();
        for entry in &self.cors_allowed_origins {
            origins.extend(
                entry
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from),
            );
        }
        origins
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("bind", &format!("{}:{}", self.host, self.port))
            .field("worker_count", &self.worker_count)
            .field("redis_url", &self.redis_url.as_deref().map(mask))
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("trust_x_forwarded_for", &self.trust_x_forwarded_for)
            .field("emailjs_api_url", &self.emailjs_api_url)
            .field("emailjs_service_id", &self.emailjs_service_id)
            .field("emailjs_template_id", &self.emailjs_template_id)
            .field("emailjs_public_key", &mask(&self.emailjs_public_key))
            .field("emailjs_access_token", &self.emailjs_access_token.as_deref().map(mask))
            .field("contact_to_email", &self.contact_to_email)
            .field("csrf_auto_refresh", &self.csrf_auto_refresh)
            .finish()
    }
}
