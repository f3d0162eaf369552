use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{bot_detection, entities, sanitize, use_cases, validation};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{csrf, limiter, mail, storage, utils};

use csrf::token_manager::CsrfTokenManager;
use limiter::rate_limiter::RateLimiter;
use mail::emailjs::EmailJsClient;
use repositories::{email::EmailSender, store::SharedStore};
use storage::{memory::MemoryStore, redis_store::RedisStore};
use use_cases::contact::{ContactHandler, ContactSettings};
use utils::clock::{SharedClock, SystemClock};

pub type AppContactHandler = ContactHandler<Arc<dyn EmailSender>>;

pub struct AppState {
    pub contact_handler: AppContactHandler,
    pub store: SharedStore,
    pub trust_x_forwarded_for: bool,
}

impl AppState {
    pub fn new(config: &settings::AppConfig) -> Self {
        let store: SharedStore = match config.redis_url.as_ref() {
            Some(url) => match RedisStore::open(url, &config.name) {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    tracing::error!("Redis store unavailable, falling back to memory: {}", e);
                    Arc::new(MemoryStore::new())
                }
            },
            None => Arc::new(MemoryStore::new()),
        };

        let email_sender: Arc<dyn EmailSender> = Arc::new(EmailJsClient::new(config));

        Self::with_parts(config, store, email_sender, Arc::new(SystemClock))
    }

    /// Builds the state from explicit collaborators.
    pub fn with_parts(
        config: &settings::AppConfig,
        store: SharedStore,
        email_sender: Arc<dyn EmailSender>,
        clock: SharedClock,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(store.clone(), clock.clone()));
        let csrf_manager = Arc::new(CsrfTokenManager::new(store.clone(), clock.clone()));

        let contact_handler = ContactHandler::new(
            rate_limiter,
            csrf_manager,
            email_sender,
            clock,
            ContactSettings::new(&config.contact_to_email, config.csrf_auto_refresh),
        );

        AppState {
            contact_handler,
            store,
            trust_x_forwarded_for: config.trust_x_forwarded_for,
        }
    }
}
