//! Petopia cache layer
//!
//! A shadow cache in front of the document store:
//!
//! - **Adapter**: [`FailOpenCache`] wraps a [`CacheBackend`] so backend
//!   failures read as misses and never reach callers.
//! - **Coherence**: [`CoherenceManager`] serves read-through lookups and, after
//!   every committed mutation, applies the row of [`POLICY`] for its kind:
//!   populate, drop or patch the post entry, drop listing pages, refresh pets.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"        # memory | redis | disabled
//! redis_url = "redis://127.0.0.1:6379"
//! memory_capacity = 1024
//! op_timeout_ms = 250
//! pets_ttl_seconds = 3600
//! ```

mod adapter;
mod backend;
mod config;
mod events;
mod keys;
pub(crate) mod lock;
mod manager;
mod memory;
mod patch;
mod planner;
mod redis;

pub use adapter::FailOpenCache;
pub use backend::{CacheBackend, CacheBackendError, OfflineBackend};
pub use config::{CacheBackendKind, CacheConfig};
pub use events::{Mutation, MutationKind};
pub use keys::{CacheKey, CacheLocation, POST_PAGES_HASH, POSTS_HASH};
pub use manager::CoherenceManager;
pub use memory::MemoryBackend;
pub use patch::{PatchOutcome, PostPatch};
pub use planner::{CoherencePlan, EntryRule, POLICY, PagesRule, PetsAction, PolicyRow, PostAction, policy_for};
pub use redis::RedisBackend;

pub(crate) mod metric_names {
    pub(crate) use super::adapter::METRIC_BACKEND_ERROR;
    pub(crate) use super::manager::{METRIC_APPLY_MS, METRIC_HIT, METRIC_MISS, METRIC_PATCH};
    pub(crate) use super::memory::METRIC_EVICTIONS;
}
