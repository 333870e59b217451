//! Bounded in-process cache backend with Redis-like string and hash values.

use std::{
    num::NonZeroUsize,
    sync::RwLock,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::{
    backend::{CacheBackend, CacheBackendError},
    lock::{read_guard, write_guard},
};

const OWNER: &str = "cache::memory";
pub(crate) const METRIC_EVICTIONS: &str = "petopia_cache_memory_evictions_total";

#[derive(Debug)]
enum Slot {
    Text {
        value: String,
        expires_at: Option<Instant>,
    },
    Hash(LruCache<String, String>),
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Slot::Text { expires_at: Some(at), .. } if *at <= now)
    }
}

/// LRU-bounded backend. `capacity` bounds the top-level keys and, separately,
/// the fields of each hash.
pub struct MemoryBackend {
    entries: RwLock<LruCache<String, Slot>>,
    capacity: NonZeroUsize,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        read_guard(&self.entries, OWNER, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: &str, slot: Slot) {
        let mut entries = write_guard(&self.entries, OWNER, "insert");
        if let Some((evicted, _)) = entries.push(key.to_string(), slot)
            && evicted != key
        {
            debug!(key = %evicted, "memory cache evicted least recently used key");
            counter!(METRIC_EVICTIONS).increment(1);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut entries = write_guard(&self.entries, OWNER, "get");
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(slot) => slot.is_expired(Instant::now()),
        };
        if expired {
            entries.pop(key);
            return Ok(None);
        }
        match entries.peek(key) {
            None => Ok(None),
            Some(Slot::Text { value, .. }) => Ok(Some(value.clone())),
            Some(Slot::Hash(_)) => Err(CacheBackendError::wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheBackendError> {
        self.insert(
            key,
            Slot::Text {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), CacheBackendError> {
        self.insert(
            key,
            Slot::Text {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn h_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheBackendError> {
        let mut entries = write_guard(&self.entries, OWNER, "h_get");
        match entries.get_mut(key) {
            None => Ok(None),
            Some(Slot::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(Slot::Text { .. }) => Err(CacheBackendError::wrong_type(key)),
        }
    }

    async fn h_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheBackendError> {
        {
            let mut entries = write_guard(&self.entries, OWNER, "h_set");
            match entries.get_mut(key) {
                Some(Slot::Hash(fields)) => {
                    if let Some((evicted, _)) = fields.push(field.to_string(), value.to_string())
                        && evicted != field
                    {
                        debug!(
                            key,
                            field = %evicted,
                            "memory cache evicted least recently used field"
                        );
                        counter!(METRIC_EVICTIONS).increment(1);
                    }
                    return Ok(());
                }
                Some(Slot::Text { .. }) => return Err(CacheBackendError::wrong_type(key)),
                None => {}
            }
        }
        let mut fields = LruCache::new(self.capacity);
        fields.put(field.to_string(), value.to_string());
        self.insert(key, Slot::Hash(fields));
        Ok(())
    }

    async fn h_delete(&self, key: &str, field: &str) -> Result<(), CacheBackendError> {
        let mut entries = write_guard(&self.entries, OWNER, "h_delete");
        let now_empty = match entries.peek_mut(key) {
            None => return Ok(()),
            Some(Slot::Hash(fields)) => {
                fields.pop(field);
                fields.is_empty()
            }
            Some(Slot::Text { .. }) => return Err(CacheBackendError::wrong_type(key)),
        };
        if now_empty {
            entries.pop(key);
        }
        Ok(())
    }

    async fn h_exists(&self, key: &str, field: &str) -> Result<bool, CacheBackendError> {
        let entries = read_guard(&self.entries, OWNER, "h_exists");
        match entries.peek(key) {
            None => Ok(false),
            Some(Slot::Hash(fields)) => Ok(fields.contains(field)),
            Some(Slot::Text { .. }) => Err(CacheBackendError::wrong_type(key)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError> {
        write_guard(&self.entries, OWNER, "delete").pop(key);
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheBackendError> {
        write_guard(&self.entries, OWNER, "flush").clear();
        Ok(())
    }
}
