use crate::{
    constants::RATE_LIMIT_KEY_PREFIX,
    entities::rate_limit::{LimiterType, RateLimitResult, RateLimitState},
    errors::StorageError,
    repositories::store::SharedStore,
    utils::{clock::SharedClock, key_locks::KeyLocks},
};

/// Per-identifier attempt counter with a rolling window and escalating
/// blocks, persisted in a key/value store.
///
/// States per (identifier, limiter type):
/// fresh -> accumulating -> limit reached -> blocked -> fresh again once the
/// block and the window have both run out.
pub struct RateLimiter {
    store: SharedStore,
    clock: SharedClock,
    locks: KeyLocks,
}

impl RateLimiter {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        RateLimiter {
            store,
            clock,
            locks: KeyLocks::new(),
        }
    }

    fn key(identifier: &str, limiter: LimiterType) -> String {
        format!(
            "{}{}:{}",
            RATE_LIMIT_KEY_PREFIX,
            limiter.as_str(),
            urlencoding::encode(identifier)
        )
    }

    /// Limiter type encoded in a stored key.
    fn limiter_of(key: &str) -> Option<LimiterType> {
        key.strip_prefix(RATE_LIMIT_KEY_PREFIX)?
            .split(':')
            .next()
            .and_then(LimiterType::parse)
    }

    async fn load(&self, key: &str) -> Result<Option<RateLimitState>, StorageError> {
        match self.store.get(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(state) => Ok(Some(state)),
                Err(e) => {
                    // A corrupt record must not lock the user out forever.
                    tracing::warn!("Discarding unreadable rate limit record {}: {}", key, e);
                    self.store.delete(key).await?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, state: &RateLimitState) -> Result<(), StorageError> {
        let raw = serde_json::to_string(state)?;
        self.store.set(key, &raw).await
    }

    /// Current standing without recording an attempt. Records whose window
    /// ran out (and that are not inside an active block) are dropped.
    pub async fn check(&self, identifier: &str, limiter: LimiterType) -> Result<RateLimitResult, StorageError> {
        let config = limiter.config();
        let key = Self::key(identifier, limiter);

        let _guard = self.locks.acquire(&key).await;
        let now = self.clock.now_ms();
        let state = match self.load(&key).await? {
            Some(state) => state,
            None => return Ok(RateLimitResult::fresh(now, &config)),
        };

        if state.is_stale(now, config.window_ms) {
            self.store.delete(&key).await?;
            return Ok(RateLimitResult::fresh(now, &config));
        }

        Ok(RateLimitResult::from_state(&state, now, &config))
    }

    /// Records one attempt and returns the resulting standing.
    ///
    /// A successful contact form attempt clears the record instead of
    /// counting. Any other attempt increments the counter; reaching the
    /// maximum starts a block, doubled once attempts exceed twice the maximum.
    pub async fn record_attempt(
        &self,
        identifier: &str,
        limiter: LimiterType,
        success: bool,
    ) -> Result<RateLimitResult, StorageError> {
        let config = limiter.config();
        let key = Self::key(identifier, limiter);

        let _guard = self.locks.acquire(&key).await;
        let now = self.clock.now_ms();

        if success && limiter.resets_on_success() {
            self.store.delete(&key).await?;
            tracing::debug!("Rate limit reset after success for {} ({})", identifier, limiter);
            return Ok(RateLimitResult::fresh(now, &config));
        }

        let mut state = self
            .load(&key)
            .await?
            .unwrap_or_else(|| RateLimitState::fresh(now));

        if state.blocked && !state.is_blocked_at(now) {
            state.blocked = false;
            state.block_until = None;
        }

        if state.is_stale(now, config.window_ms) {
            state = RateLimitState::fresh(now);
        }

        state.attempts += 1;
        state.last_attempt = now;

        if state.attempts >= config.max_attempts {
            let multiplier = if state.attempts > config.max_attempts * 2 { 2 } else { 1 };
            let block_until = now + config.block_duration_ms * multiplier;
            state.blocked = true;
            state.block_until = Some(block_until);

            tracing::warn!(
                "Rate limit block for {} ({}): {} attempts, blocked until {}",
                identifier,
                limiter,
                state.attempts,
                block_until
            );
        }

        self.save(&key, &state).await?;
        Ok(RateLimitResult::from_state(&state, now, &config))
    }

    /// Clears all state for an identifier.
    pub async fn reset(&self, identifier: &str, limiter: LimiterType) -> Result<(), StorageError> {
        let key = Self::key(identifier, limiter);
        let _guard = self.locks.acquire(&key).await;
        self.store.delete(&key).await
    }

    /// Drops every record whose block and window have both lapsed, plus
    /// unreadable ones. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let mut removed = 0;

        for key in self.store.keys_with_prefix(RATE_LIMIT_KEY_PREFIX).await? {
            let Some(limiter) = Self::limiter_of(&key) else {
                continue;
            };

            let _guard = self.locks.acquire(&key).await;
            let now = self.clock.now_ms();
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };

            let expired = match serde_json::from_str::<RateLimitState>(&raw) {
                Ok(state) => state.is_stale(now, limiter.config().window_ms),
                Err(_) => true,
            };
            if expired {
                self.store.delete(&key).await?;
                removed += 1;
            }
        }

        self.locks.prune();
        Ok(removed)
    }
}
