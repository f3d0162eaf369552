use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;

use crate::{errors::StorageError, repositories::store::KeyValueStore};

const SCAN_BATCH: usize = 200;

/// Redis-backed store so throttling and tokens survive restarts and are
/// shared between instances.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    namespace: String,
}

impl RedisStore {
    /// Builds the connection pool. No connection is made until first use.
    pub fn open(url: &str, namespace: &str) -> Result<Self, StorageError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(RedisStore {
            pool,
            namespace: namespace.to_string(),
        })
    }

    async fn connection(&self) -> Result<Connection, StorageError> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(self.namespaced(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", self.namespaced(prefix));
        let strip = format!("{}:", self.namespace);

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&strip).map(str::to_string)),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StorageError::Operation(format!("unexpected PING reply: {}", pong)))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
