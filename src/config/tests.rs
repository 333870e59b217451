use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.op_timeout_ms = Some(900);

    let overrides = Overrides {
        log_level: Some("debug".to_string()),
        cache_op_timeout_ms: Some(40),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.op_timeout_ms.get(), 40);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn defaults_select_memory_store_and_cache() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.store.url.is_none());
    assert_eq!(settings.store.max_connections.get(), 8);
    assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
    assert_eq!(settings.cache.memory_capacity, 1024);
    assert_eq!(settings.cache.op_timeout_ms.get(), 250);
    assert_eq!(settings.cache.pets_ttl_seconds.get(), 3600);
    assert!(!settings.cache.flush_on_startup);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn blank_store_url_means_memory_store() {
    let mut raw = RawSettings::default();
    raw.store.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.store.url.is_none());
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some(CacheBackendKind::Redis);

    let err = Settings::from_raw(raw.clone()).expect_err("missing redis url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));

    raw.cache.redis_url = Some("redis://127.0.0.1:6379".to_string());
    raw.store.url = Some("postgres://localhost/petopia".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache_config().backend, CacheBackendKind::Redis);
}

#[test]
fn redis_cache_requires_persistent_store() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some(CacheBackendKind::Redis);
    raw.cache.redis_url = Some("redis://127.0.0.1:6379".to_string());

    let err = Settings::from_raw(raw.clone()).expect_err("in-memory store with redis cache");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));

    raw.store.url = Some("  ".to_string());
    assert!(Settings::from_raw(raw.clone()).is_err());

    raw.cache.backend = Some(CacheBackendKind::Memory);
    let settings = Settings::from_raw(raw).expect("memory cache pairs with memory store");
    assert!(!settings.cache_outlives_store());
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.op_timeout_ms = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.op_timeout_ms",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.store.max_connections = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "store.max_connections",
            ..
        })
    ));
}

#[test]
fn invalid_log_level_is_reported() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn default_to_first_feed_page() {
    let args = CliArgs::parse_from(["petopia"]);
    let command = args.command.unwrap_or_default();
    assert_eq!(command, Command::Feed(FeedArgs { page: 1 }));
}

#[test]
fn parse_feed_page() {
    let args = CliArgs::parse_from(["petopia", "feed", "--page", "3"]);
    assert_eq!(args.command, Some(Command::Feed(FeedArgs { page: 3 })));
}

#[test]
fn parse_search_with_global_overrides() {
    let args = CliArgs::parse_from([
        "petopia",
        "search",
        "dog",
        "--cache-backend",
        "disabled",
        "--store-url",
        "postgres://example",
    ]);

    match args.command.expect("search command") {
        Command::Search(search) => {
            assert_eq!(search.keyword, "dog");
            assert!(search.author.is_none());
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
    assert_eq!(
        args.overrides.cache_backend,
        Some(CacheBackendKind::Disabled)
    );
    assert_eq!(
        args.overrides.store_url.as_deref(),
        Some("postgres://example")
    );
}

#[test]
fn parse_post_and_flush_cache() {
    let args = CliArgs::parse_from(["petopia", "post", "abc"]);
    assert_eq!(
        args.command,
        Some(Command::Post(PostArgs {
            id: "abc".to_string()
        }))
    );

    let args = CliArgs::parse_from(["petopia", "flush-cache"]);
    assert_eq!(args.command, Some(Command::FlushCache));
}
