use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::StorageError;

/// Origin-scoped key/value storage holding rate-limit and CSRF state.
///
/// Callers that read, modify and write a key hold that key's lock from
/// `utils::key_locks` across the whole sequence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, used by periodic sweeps.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Liveness check for health reporting.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Human-readable backend name.
    fn backend(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn KeyValueStore>;
