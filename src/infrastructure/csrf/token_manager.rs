use std::fmt::Write as _;

use rand::{rngs::OsRng, RngCore};

use crate::{
    constants::{CSRF_KEY_PREFIX, CSRF_MAX_TOKENS_PER_SESSION, CSRF_TOKEN_BYTES, CSRF_TOKEN_TTL_MS},
    entities::token::CsrfToken,
    errors::StorageError,
    repositories::store::SharedStore,
    utils::{clock::SharedClock, key_locks::KeyLocks},
};

/// Issues and consumes single-use CSRF tokens, a few per session.
pub struct CsrfTokenManager {
    store: SharedStore,
    clock: SharedClock,
    ttl_ms: i64,
    max_tokens: usize,
    locks: KeyLocks,
}

/// 32 random bytes from the OS RNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    bytes.iter().fold(String::with_capacity(CSRF_TOKEN_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

impl CsrfTokenManager {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        CsrfTokenManager {
            store,
            clock,
            ttl_ms: CSRF_TOKEN_TTL_MS,
            max_tokens: CSRF_MAX_TOKENS_PER_SESSION,
            locks: KeyLocks::new(),
        }
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", CSRF_KEY_PREFIX, urlencoding::encode(session_id))
    }

    /// Unexpired tokens for the stored key.
    async fn load(&self, key: &str, now: i64) -> Result<Vec<CsrfToken>, StorageError> {
        let tokens: Vec<CsrfToken> = match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable CSRF token list {}: {}", key, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        Ok(tokens.into_iter().filter(|t| !t.is_expired(now)).collect())
    }

    /// Drops expired entries and keeps only the most recent `max_tokens`.
    async fn save(&self, key: &str, mut tokens: Vec<CsrfToken>, now: i64) -> Result<(), StorageError> {
        tokens.retain(|t| !t.is_expired(now));
        tokens.sort_by_key(|t| t.created_at);
        if tokens.len() > self.max_tokens {
            tokens.drain(..tokens.len() - self.max_tokens);
        }

        if tokens.is_empty() {
            return self.store.delete(key).await;
        }
        let raw = serde_json::to_string(&tokens)?;
        self.store.set(key, &raw).await
    }

    async fn mint(&self, key: &str, mut tokens: Vec<CsrfToken>, now: i64) -> Result<String, StorageError> {
        let token = CsrfToken::new(generate_token(), now, self.ttl_ms);
        let value = token.token.clone();
        tokens.push(token);
        self.save(key, tokens, now).await?;
        Ok(value)
    }

    /// Newest usable token for the session, minting one when none is left.
    pub async fn get_current_token(&self, session_id: &str) -> Result<String, StorageError> {
        let key = Self::key(session_id);
        let _guard = self.locks.acquire(&key).await;
        let now = self.clock.now_ms();

        let tokens = self.load(&key, now).await?;
        if let Some(current) = tokens
            .iter()
            .filter(|t| t.is_valid(now))
            .max_by_key(|t| t.created_at)
        {
            return Ok(current.token.clone());
        }

        self.mint(&key, tokens, now).await
    }

    /// Always mints a new token for the session.
    pub async fn refresh_token(&self, session_id: &str) -> Result<String, StorageError> {
        let key = Self::key(session_id);
        let _guard = self.locks.acquire(&key).await;
        let now = self.clock.now_ms();

        let tokens = self.load(&key, now).await?;
        self.mint(&key, tokens, now).await
    }

    /// Consumes `token`. Returns true at most once per token.
    pub async fn validate_token(&self, session_id: &str, token: &str) -> Result<bool, StorageError> {
        if token.is_empty() {
            return Ok(false);
        }

        let key = Self::key(session_id);
        let _guard = self.locks.acquire(&key).await;
        let now = self.clock.now_ms();

        let mut tokens = self.load(&key, now).await?;
        let matched = tokens
            .iter_mut()
            .find(|t| t.token == token && t.is_valid(now));

        match matched {
            Some(entry) => {
                entry.used = true;
                self.save(&key, tokens, now).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether `token` would validate, without consuming it.
    pub async fn is_token_valid(&self, session_id: &str, token: &str) -> Result<bool, StorageError> {
        if token.is_empty() {
            return Ok(false);
        }

        let key = Self::key(session_id);
        let now = self.clock.now_ms();
        let tokens = self.load(&key, now).await?;
        Ok(tokens.iter().any(|t| t.token == token && t.is_valid(now)))
    }

    /// Purges expired tokens across all sessions and drops sessions left
    /// with none. Returns how many tokens were removed.
    pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let mut removed = 0;

        for key in self.store.keys_with_prefix(CSRF_KEY_PREFIX).await? {
            let _guard = self.locks.acquire(&key).await;
            let now = self.clock.now_ms();
            let raw = match self.store.get(&key).await? {
                Some(raw) => raw,
                None => continue,
            };
            let stored: Vec<CsrfToken> = serde_json::from_str(&raw).unwrap_or_default();
            let before = stored.len();
            let live: Vec<CsrfToken> = stored.into_iter().filter(|t| !t.is_expired(now)).collect();

            if live.len() != before || live.is_empty() {
                removed += before - live.len();
                self.save(&key, live, now).await?;
            }
        }

        self.locks.prune();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        repositories::store::KeyValueStore,
        storage::memory::MemoryStore,
        utils::clock::ManualClock,
    };

    const START: i64 = 1_700_000_000_000;

    fn manager() -> (CsrfTokenManager, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(MemoryStore::new());
        (CsrfTokenManager::new(store.clone(), clock.clone()), clock, store)
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn current_token_is_reused_until_consumed() {
        let (manager, _, _) = manager();
        let first = manager.get_current_token("s1").await.unwrap();
        assert_eq!(manager.get_current_token("s1").await.unwrap(), first);

        assert!(manager.validate_token("s1", &first).await.unwrap());
        assert_ne!(manager.get_current_token("s1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn validate_token_is_single_use() {
        let (manager, _, _) = manager();
        let token = manager.get_current_token("s1").await.unwrap();

        assert!(manager.is_token_valid("s1", &token).await.unwrap());
        assert!(manager.is_token_valid("s1", &token).await.unwrap());
        assert!(manager.validate_token("s1", &token).await.unwrap());
        assert!(!manager.validate_token("s1", &token).await.unwrap());
        assert!(!manager.is_token_valid("s1", &token).await.unwrap());
    }

    #[tokio::test]
    async fn tokens_expire_after_ttl() {
        let (manager, clock, _) = manager();
        let token = manager.get_current_token("s1").await.unwrap();

        clock.advance(CSRF_TOKEN_TTL_MS - 1);
        assert!(manager.is_token_valid("s1", &token).await.unwrap());

        clock.advance(1);
        assert!(!manager.is_token_valid("s1", &token).await.unwrap());
        assert!(!manager.validate_token("s1", &token).await.unwrap());
    }

    #[tokio::test]
    async fn tokens_are_scoped_to_their_session() {
        let (manager, _, _) = manager();
        let token = manager.get_current_token("s1").await.unwrap();
        assert!(!manager.validate_token("s2", &token).await.unwrap());
        assert!(manager.validate_token("s1", &token).await.unwrap());
    }

    #[tokio::test]
    async fn only_most_recent_tokens_are_kept() {
        let (manager, clock, _) = manager();
        let mut issued = Vec::new();
        for _ in 0..7 {
            issued.push(manager.refresh_token("s1").await.unwrap());
            clock.advance(10);
        }

        assert!(!manager.is_token_valid("s1", &issued[0]).await.unwrap());
        assert!(!manager.is_token_valid("s1", &issued[1]).await.unwrap());
        for token in &issued[2..] {
            assert!(manager.is_token_valid("s1", token).await.unwrap());
        }
    }

    #[tokio::test]
    async fn empty_and_unknown_tokens_never_validate() {
        let (manager, _, _) = manager();
        manager.get_current_token("s1").await.unwrap();
        assert!(!manager.validate_token("s1", "").await.unwrap());
        assert!(!manager.validate_token("s1", "deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn cleanup_removes_expired_sessions() {
        let (manager, clock, store) = manager();
        manager.get_current_token("old").await.unwrap();
        clock.advance(CSRF_TOKEN_TTL_MS / 2);
        manager.get_current_token("new").await.unwrap();
        clock.advance(CSRF_TOKEN_TTL_MS / 2);

        assert_eq!(manager.cleanup_expired().await.unwrap(), 1);
        assert!(store.get("csrf_tokens:old").await.unwrap().is_none());
        assert!(store.get("csrf_tokens:new").await.unwrap().is_some());
    }
}
