//! Redis-backed object store.
//!
//! The twin of the SQL `key_value` table, selected when
//! `FEDIFY_KV_STORE_TYPE=redis`. Values are JSON strings keyed by the
//! exact IRI; writes are last-writer-wins.

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use ghostpub_common::{AppError, AppResult};
use ghostpub_db::ObjectStore;
use serde_json::Value;
use std::sync::Arc;

/// Object store over Redis.
#[derive(Clone)]
pub struct RedisObjectStore {
    redis: Arc<RedisClient>,
}

impl RedisObjectStore {
    /// Create a new Redis object store.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ObjectStore for RedisObjectStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let stored: Option<String> = self
            .redis
            .get(key)
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;

        match stored {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str)
                    .map_err(|e| AppError::KvStore(format!("Stored value unparsable: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let json_str = serde_json::to_string(&value)
            .map_err(|e| AppError::KvStore(e.to_string()))?;

        self.redis
            .set::<(), _, _>(key, json_str, None, None, false)
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.redis
            .del::<(), _>(key)
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;
        Ok(())
    }
}
