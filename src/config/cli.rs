use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::cache::CacheBackendKind;

/// Command-line arguments for the Petopia binary.
#[derive(Debug, Parser)]
#[command(name = "petopia", version, about = "Petopia community feed core")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PETOPIA_CONFIG_FILE", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the document table in the configured Postgres store.
    Migrate,
    /// Replace all data with demo users, posts, comments and likes.
    Seed,
    /// Print one page of the community feed.
    Feed(FeedArgs),
    /// Print a post with its comments ranked by likes.
    Post(PostArgs),
    /// Search posts by keyword, newest first.
    Search(SearchArgs),
    /// Drop every cache entry.
    #[command(name = "flush-cache")]
    FlushCache,
}

impl Default for Command {
    fn default() -> Self {
        Command::Feed(FeedArgs::default())
    }
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct FeedArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

impl Default for FeedArgs {
    fn default() -> Self {
        Self { page: 1 }
    }
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct PostArgs {
    #[arg(value_name = "POST_ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    /// Case-insensitive substring of a title or description.
    #[arg(value_name = "KEYWORD")]
    pub keyword: String,

    /// Only posts by this user id.
    #[arg(long, value_name = "USER_ID")]
    pub author: Option<String>,
}

/// Settings overrides accepted by every command.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the Postgres document store URL.
    #[arg(long = "store-url", value_name = "URL", global = true)]
    pub store_url: Option<String>,

    /// Override the cache backend.
    #[arg(long = "cache-backend", value_name = "BACKEND", value_enum, global = true)]
    pub cache_backend: Option<CacheBackendKind>,

    /// Override the Redis URL used by the redis cache backend.
    #[arg(long = "redis-url", value_name = "URL", global = true)]
    pub redis_url: Option<String>,

    /// Override the per-call cache timeout.
    #[arg(long = "cache-op-timeout-ms", value_name = "MILLIS", global = true)]
    pub cache_op_timeout_ms: Option<u64>,
}
