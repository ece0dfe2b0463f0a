//! Redis-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::CacheStore;
use crate::error::ApiError;

/// Cache over a shared `ConnectionManager`; clones share the connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

fn cache_err(e: redis::RedisError) -> ApiError {
    ApiError::Cache(e.to_string())
}

impl RedisCache {
    /// Connects to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Cache`] if the URL is malformed or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, ApiError> {
        let client = Client::open(redis_url).map_err(cache_err)?;
        let conn = ConnectionManager::new(client).await.map_err(cache_err)?;
        tracing::info!("redis connection manager ready");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(cache_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        match ttl {
            // SETEX rejects zero, so sub-second TTLs round up.
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                let _: () = conn.set_ex(key, value, secs).await.map_err(cache_err)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(cache_err)?;
            }
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ApiError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys).await.map_err(cache_err)?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.conn.clone();
        conn.get_del(key).await.map_err(cache_err)
    }
}
