//! Cache configuration.
//!
//! Selects the cache backend and bounds how long the feed may wait on it.

use std::{fmt, num::NonZeroUsize, time::Duration};

use serde::Deserialize;

const DEFAULT_MEMORY_CAPACITY: usize = 1024;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_PETS_TTL_SECONDS: u64 = 3600;

/// Which cache backend serves the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Bounded in-process LRU.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
    /// No cache; every read goes to the store.
    Disabled,
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Redis => "redis",
            CacheBackendKind::Disabled => "disabled",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Required when `backend` is `redis`.
    pub redis_url: Option<String>,
    /// Maximum keys held by the memory backend, and maximum fields per hash.
    pub memory_capacity: usize,
    /// Upper bound for a single backend call.
    pub op_timeout_ms: u64,
    /// Lifetime of a cached pet list.
    pub pets_ttl_seconds: u64,
    /// Flush the backend once the feed context is connected.
    pub flush_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            redis_url: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            pets_ttl_seconds: DEFAULT_PETS_TTL_SECONDS,
            flush_on_startup: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            memory_capacity: settings.memory_capacity,
            op_timeout_ms: settings.op_timeout_ms.get(),
            pets_ttl_seconds: settings.pets_ttl_seconds.get(),
            flush_on_startup: settings.flush_on_startup,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.backend != CacheBackendKind::Disabled
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Per-call timeout; zero is raised to one millisecond.
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms.max(1))
    }

    pub fn pets_ttl(&self) -> Duration {
        Duration::from_secs(self.pets_ttl_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert!(config.redis_url.is_none());
        assert_eq!(config.memory_capacity, 1024);
        assert_eq!(config.op_timeout(), Duration::from_millis(250));
        assert_eq!(config.pets_ttl(), Duration::from_secs(3600));
        assert!(!config.flush_on_startup);
        assert!(config.is_enabled());
    }

    #[test]
    fn disabled_backend_is_not_enabled() {
        let config = CacheConfig {
            backend: CacheBackendKind::Disabled,
            ..Default::default()
        };
        assert!(!config.is_enabled());
    }

    #[test]
    fn zero_bounds_are_clamped() {
        let config = CacheConfig {
            memory_capacity: 0,
            op_timeout_ms: 0,
            pets_ttl_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_capacity_non_zero().get(), 1);
        assert_eq!(config.op_timeout(), Duration::from_millis(1));
        assert_eq!(config.pets_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn backend_kind_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: CacheBackendKind,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"backend":"redis"}"#).expect("parse");
        assert_eq!(parsed.backend, CacheBackendKind::Redis);
        assert_eq!(CacheBackendKind::Disabled.to_string(), "disabled");
    }
}
