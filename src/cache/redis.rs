//! Redis cache backend over a deadpool connection pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{
    Config as PoolConfig, Connection, Pool, Runtime,
    redis::{AsyncCommands, cmd},
};
use tracing::info;

use super::backend::{CacheBackend, CacheBackendError};

pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Builds the pool. Connections are opened lazily on first use, so an
    /// unreachable server surfaces as per-call failures rather than here.
    pub fn connect(url: &str) -> Result<Self, CacheBackendError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(CacheBackendError::backend)?;
        info!(backend = "redis", "cache pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<Connection, CacheBackendError> {
        self.pool.get().await.map_err(|err| {
            CacheBackendError::Backend(format!("redis connection failed: {err}"))
        })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.get(key).await.map_err(CacheBackendError::backend)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.set(key, value).await.map_err(CacheBackendError::backend)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        connection
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(CacheBackendError::backend)
    }

    async fn h_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.hget(key, field).await.map_err(CacheBackendError::backend)
    }

    async fn h_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.hset(key, field, value).await.map_err(CacheBackendError::backend)
    }

    async fn h_delete(&self, key: &str, field: &str) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.hdel(key, field).await.map_err(CacheBackendError::backend)
    }

    async fn h_exists(&self, key: &str, field: &str) -> Result<bool, CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.hexists(key, field).await.map_err(CacheBackendError::backend)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        connection.del(key).await.map_err(CacheBackendError::backend)
    }

    async fn flush(&self) -> Result<(), CacheBackendError> {
        let mut connection = self.connection().await?;
        cmd("FLUSHDB")
            .query_async::<()>(&mut *connection)
            .await
            .map_err(CacheBackendError::backend)
    }

    async fn close(&self) {
        self.pool.close();
    }
}
