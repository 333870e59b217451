//! Fail-open facade over a [`CacheBackend`].
//!
//! Backend errors and timeouts never reach callers: reads degrade to a miss,
//! writes are dropped. Each failure is logged and counted.

use std::{future::Future, sync::Arc, time::Duration};

use metrics::counter;
use tracing::warn;

use super::backend::{CacheBackend, CacheBackendError, OfflineBackend};

pub(crate) const METRIC_BACKEND_ERROR: &str = "petopia_cache_backend_error_total";

#[derive(Clone)]
pub struct FailOpenCache {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
}

impl FailOpenCache {
    pub fn new(backend: Arc<dyn CacheBackend>, op_timeout: Duration) -> Self {
        Self {
            backend,
            op_timeout,
        }
    }

    /// A cache that misses on every read.
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineBackend), Duration::from_millis(1))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn guard<T, F>(&self, op: &'static str, key: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, CacheBackendError>>,
    {
        let error = match tokio::time::timeout(self.op_timeout, call).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("timed out after {}ms", self.op_timeout.as_millis()),
        };
        warn!(
            op,
            key,
            backend = self.backend.name(),
            error = %error,
            "cache call failed; continuing without cache"
        );
        counter!(METRIC_BACKEND_ERROR, "op" => op).increment(1);
        None
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.guard("get", key, self.backend.get(key)).await.flatten()
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.guard("set", key, self.backend.set(key, value)).await;
    }

    pub async fn set_with_ttl(&self, key: &str, ttl: Duration, value: &str) {
        self.guard("set_with_ttl", key, self.backend.set_with_ttl(key, ttl, value))
            .await;
    }

    pub async fn h_get(&self, key: &str, field: &str) -> Option<String> {
        self.guard("h_get", key, self.backend.h_get(key, field))
            .await
            .flatten()
    }

    pub async fn h_set(&self, key: &str, field: &str, value: &str) {
        self.guard("h_set", key, self.backend.h_set(key, field, value))
            .await;
    }

    pub async fn h_delete(&self, key: &str, field: &str) {
        self.guard("h_delete", key, self.backend.h_delete(key, field))
            .await;
    }

    pub async fn h_exists(&self, key: &str, field: &str) -> bool {
        self.guard("h_exists", key, self.backend.h_exists(key, field))
            .await
            .unwrap_or(false)
    }

    pub async fn delete(&self, key: &str) {
        self.guard("delete", key, self.backend.delete(key)).await;
    }

    pub async fn flush(&self) {
        self.guard("flush", "*", self.backend.flush()).await;
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}
