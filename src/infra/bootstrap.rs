//! Builds the document store, the cache adapter and the feed context from settings.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{context::FeedContext, store::DocumentStore},
    cache::{CacheBackendKind, CacheConfig, FailOpenCache, MemoryBackend, RedisBackend},
    config::{Settings, StoreSettings},
};

use super::{db::PostgresDocumentStore, error::InfraError, memory::MemoryDocumentStore};

/// Connects to Postgres when a URL is configured, otherwise returns an in-process store.
pub async fn connect_store(settings: &StoreSettings) -> Result<Arc<dyn DocumentStore>, InfraError> {
    let Some(url) = settings.url.as_deref() else {
        info!(store = "memory", "using in-process document store");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    };

    let pool = PostgresDocumentStore::connect(url, settings.max_connections.get())
        .await
        .map_err(|err| InfraError::database(format!("failed to connect to postgres: {err}")))?;
    let store = PostgresDocumentStore::new(pool);
    store
        .health_check()
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!(
        store = "postgres",
        max_connections = settings.max_connections.get(),
        "document store connected"
    );
    Ok(Arc::new(store))
}

/// Applies pending migrations. Only meaningful for the Postgres store.
pub async fn migrate(settings: &StoreSettings) -> Result<(), InfraError> {
    let url = settings.url.as_deref().ok_or_else(|| {
        InfraError::configuration("`store.url` must be set to run migrations")
    })?;

    let pool = PostgresDocumentStore::connect(url, settings.max_connections.get())
        .await
        .map_err(|err| InfraError::database(format!("failed to connect to postgres: {err}")))?;
    PostgresDocumentStore::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(format!("failed to run migrations: {err}")))?;
    pool.close().await;
    info!("database migrations applied");
    Ok(())
}

pub fn connect_cache(config: &CacheConfig) -> Result<FailOpenCache, InfraError> {
    let cache = match config.backend {
        CacheBackendKind::Memory => FailOpenCache::new(
            Arc::new(MemoryBackend::new(config.memory_capacity_non_zero())),
            config.op_timeout(),
        ),
        CacheBackendKind::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                InfraError::configuration("`cache.redis_url` is required for the redis backend")
            })?;
            let backend = RedisBackend::connect(url).map_err(|err| InfraError::cache(err.to_string()))?;
            FailOpenCache::new(Arc::new(backend), config.op_timeout())
        }
        CacheBackendKind::Disabled => FailOpenCache::offline(),
    };
    info!(backend = %config.backend, "cache adapter ready");
    Ok(cache)
}

impl FeedContext {
    /// Builds every adapter from settings. Flushes the cache first when
    /// `cache.flush_on_startup` is set. A persistent cache without a
    /// persistent store is rejected.
    pub async fn connect(settings: &Settings) -> Result<Self, InfraError> {
        if settings.cache_outlives_store() {
            return Err(InfraError::configuration(
                "`cache.backend = \"redis\"` requires `store.url`",
            ));
        }
        let cache_config = settings.cache_config();
        let store = connect_store(&settings.store).await?;
        let cache = connect_cache(&cache_config)?;
        let context = FeedContext::new(store, cache, &cache_config);

        if cache_config.flush_on_startup && cache_config.is_enabled() {
            context.coherence().flush().await;
            info!("cache flushed on startup");
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use std::num::{NonZeroU32, NonZeroU64};

    use tracing::level_filters::LevelFilter;

    use super::*;
    use crate::config::{CacheSettings, LogFormat, LoggingSettings};

    fn settings(backend: CacheBackendKind, redis_url: Option<&str>) -> Settings {
        Settings {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            store: StoreSettings {
                url: None,
                max_connections: NonZeroU32::new(1).expect("non-zero"),
            },
            cache: CacheSettings {
                backend,
                redis_url: redis_url.map(str::to_string),
                memory_capacity: 16,
                op_timeout_ms: NonZeroU64::new(50).expect("non-zero"),
                pets_ttl_seconds: NonZeroU64::new(60).expect("non-zero"),
                flush_on_startup: false,
            },
        }
    }

    #[tokio::test]
    async fn redis_cache_over_memory_store_is_rejected() {
        let settings = settings(CacheBackendKind::Redis, Some("redis://127.0.0.1:1"));
        let err = FeedContext::connect(&settings)
            .await
            .err()
            .expect("connect must fail");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[tokio::test]
    async fn memory_cache_over_memory_store_connects() {
        for backend in [CacheBackendKind::Memory, CacheBackendKind::Disabled] {
            let context = FeedContext::connect(&settings(backend, None)).await;
            assert!(context.is_ok(), "{backend} should connect");
        }
    }
}
