use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::{
    constants::CSRF_SWEEP_INTERVAL_SECS,
    csrf::token_manager::CsrfTokenManager,
    limiter::rate_limiter::RateLimiter,
};

/// Periodically drops expired CSRF tokens and lapsed rate limit records.
/// The first sweep runs immediately.
pub async fn start_sweep_task(csrf: Arc<CsrfTokenManager>, limiter: Arc<RateLimiter>) {
    let mut interval = interval(Duration::from_secs(CSRF_SWEEP_INTERVAL_SECS));

    loop {
        interval.tick().await;

        match csrf.cleanup_expired().await {
            Ok(0) => tracing::debug!("CSRF sweep found no expired tokens"),
            Ok(count) => tracing::info!("Purged {} expired CSRF tokens", count),
            Err(e) => tracing::error!("CSRF sweep failed: {}", e),
        }

        match limiter.cleanup_expired().await {
            Ok(0) => tracing::debug!("Rate limit sweep found no lapsed records"),
            Ok(count) => tracing::info!("Purged {} lapsed rate limit records", count),
            Err(e) => tracing::error!("Rate limit sweep failed: {}", e),
        }
    }
}
