//! Raw cache backends. Every call may fail; [`FailOpenCache`](super::FailOpenCache)
//! absorbs the failures.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheBackendError {
    #[error("cache backend unavailable")]
    Unavailable,
    #[error("key `{key}` holds a value of another type")]
    WrongType { key: String },
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheBackendError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn wrong_type(key: &str) -> Self {
        Self::WrongType {
            key: key.to_string(),
        }
    }
}

/// String and hash operations over a key/value cache, Redis-shaped.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheBackendError>;

    async fn set_with_ttl(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), CacheBackendError>;

    async fn h_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheBackendError>;

    async fn h_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheBackendError>;

    async fn h_delete(&self, key: &str, field: &str) -> Result<(), CacheBackendError>;

    async fn h_exists(&self, key: &str, field: &str) -> Result<bool, CacheBackendError>;

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError>;

    async fn flush(&self) -> Result<(), CacheBackendError>;

    async fn close(&self) {}
}

/// Backend that rejects every call. Serves `cache.backend = "disabled"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl CacheBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _ttl: Duration,
        _value: &str,
    ) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn h_get(&self, _key: &str, _field: &str) -> Result<Option<String>, CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn h_set(&self, _key: &str, _field: &str, _value: &str) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn h_delete(&self, _key: &str, _field: &str) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn h_exists(&self, _key: &str, _field: &str) -> Result<bool, CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }

    async fn flush(&self) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable)
    }
}
