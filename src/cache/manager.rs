//! Cache coherence manager: read-through lookups and policy-driven write
//! maintenance over a [`FailOpenCache`].

use std::{future::Future, time::Duration};

use metrics::{counter, histogram};
use serde::{Serialize, de::DeserializeOwned};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{
    adapter::FailOpenCache,
    config::CacheConfig,
    events::Mutation,
    keys::{CacheKey, CacheLocation, POST_PAGES_HASH},
    patch::{PatchOutcome, PostPatch},
    planner::{CoherencePlan, PetsAction, PostAction},
};
use crate::domain::{
    ids::{PostId, UserId},
    pets::Pet,
    posts::{Post, PostPage},
};

pub(crate) const METRIC_HIT: &str = "petopia_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "petopia_cache_miss_total";
pub(crate) const METRIC_PATCH: &str = "petopia_cache_patch_total";
pub(crate) const METRIC_APPLY_MS: &str = "petopia_cache_apply_ms";

/// Holds no per-request state; share it behind an `Arc`.
pub struct CoherenceManager {
    cache: FailOpenCache,
    pets_ttl: Duration,
}

impl CoherenceManager {
    pub fn new(cache: FailOpenCache, config: &CacheConfig) -> Self {
        Self {
            cache,
            pets_ttl: config.pets_ttl(),
        }
    }

    pub fn cache(&self) -> &FailOpenCache {
        &self.cache
    }

    /// Returns the post with comments ranked by likes, reading through the
    /// cache. `load` must return the stored document in insertion order.
    pub async fn get_post<E, F, Fut>(&self, id: PostId, load: F) -> Result<Post, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Post, E>>,
    {
        self.read_through(CacheKey::Post(id), load)
            .await
            .map(Post::ranked)
    }

    pub async fn get_page<E, F, Fut>(&self, page: u32, load: F) -> Result<PostPage, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PostPage, E>>,
    {
        self.read_through(CacheKey::PostPage(page), load).await
    }

    pub async fn get_pets<E, F, Fut>(&self, user: UserId, load: F) -> Result<Vec<Pet>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Pet>, E>>,
    {
        self.read_through(CacheKey::UserPets(user), load).await
    }

    /// Serves `key` from the cache, or runs `load` and caches its result.
    /// Loader errors pass through untouched and nothing is cached.
    pub async fn read_through<T, E, F, Fut>(&self, key: CacheKey, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(&key).await {
            counter!(METRIC_HIT, "entry" => key.entry()).increment(1);
            debug!(key = %key.location(), "cache hit");
            return Ok(value);
        }
        counter!(METRIC_MISS, "entry" => key.entry()).increment(1);
        debug!(key = %key.location(), "cache miss");

        let value = load().await?;
        self.store(&key, &value).await;
        Ok(value)
    }

    /// Applies the cache policy for a mutation the store already committed.
    pub async fn record(&self, mutation: Mutation) {
        let started = Instant::now();
        let plan = CoherencePlan::for_mutation(mutation);
        debug!(%plan, "applying cache plan");

        if let Some((post_id, action)) = plan.post {
            let key = CacheKey::Post(post_id);
            match action {
                PostAction::Populate(post) => self.store(&key, &post).await,
                PostAction::Drop => self.evict(&key).await,
                PostAction::Patch(patch) => self.patch_post(post_id, &patch).await,
            }
        }
        if plan.drop_pages {
            self.cache.delete(POST_PAGES_HASH).await;
        }
        if let Some((owner, action)) = plan.pets {
            let key = CacheKey::UserPets(owner);
            match action {
                PetsAction::Populate(pets) => self.store(&key, &pets).await,
                PetsAction::Drop => self.evict(&key).await,
            }
        }

        histogram!(METRIC_APPLY_MS).record(started.elapsed().as_secs_f64() * 1000.0);
    }

    pub async fn evict(&self, key: &CacheKey) {
        match key.location() {
            CacheLocation::Field { key, field } => self.cache.h_delete(key, &field).await,
            CacheLocation::Key(key) => self.cache.delete(&key).await,
        }
    }

    pub async fn flush(&self) {
        self.cache.flush().await;
    }

    pub async fn close(&self) {
        self.cache.close().await;
    }

    async fn patch_post(&self, id: PostId, patch: &PostPatch) {
        let key = CacheKey::Post(id);
        let Some(mut post) = self.lookup::<Post>(&key).await else {
            counter!(METRIC_PATCH, "result" => "absent").increment(1);
            return;
        };
        let outcome = patch.apply(&mut post);
        match outcome {
            PatchOutcome::Applied => self.store(&key, &post).await,
            PatchOutcome::Unresolved => {
                debug!(post_id = %id, "cached post diverged from store; dropping");
                self.evict(&key).await;
            }
        }
        counter!(METRIC_PATCH, "result" => outcome.as_str()).increment(1);
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match key.location() {
            CacheLocation::Field { key, field } => self.cache.h_get(key, &field).await,
            CacheLocation::Key(key) => self.cache.get(&key).await,
        }?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key.location(), error = %err, "undecodable cache payload; dropping");
                self.evict(key).await;
                None
            }
        }
    }

    async fn store<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key.location(), error = %err, "cache payload could not be encoded");
                return;
            }
        };
        match (key, key.location()) {
            (CacheKey::UserPets(_), CacheLocation::Key(raw)) => {
                self.cache.set_with_ttl(&raw, self.pets_ttl, &payload).await;
            }
            (_, CacheLocation::Key(raw)) => self.cache.set(&raw, &payload).await,
            (_, CacheLocation::Field { key, field }) => {
                self.cache.h_set(key, &field, &payload).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        num::NonZeroUsize,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use time::macros::datetime;

    use super::*;
    use crate::{
        cache::memory::MemoryBackend,
        domain::{
            ids::CommentId,
            posts::{Author, Comment, PostDraft},
        },
    };

    fn manager() -> CoherenceManager {
        let backend = MemoryBackend::new(NonZeroUsize::new(64).expect("non-zero"));
        let cache = FailOpenCache::new(Arc::new(backend), Duration::from_secs(1));
        CoherenceManager::new(cache, &CacheConfig::default())
    }

    fn post() -> Post {
        let author = Author::new(UserId::new(), "owner").expect("author");
        let draft = PostDraft::new("Staring problem", "Walls again", None).expect("draft");
        Post::new(author, draft, datetime!(2025-06-01 7:00 UTC))
    }

    #[tokio::test]
    async fn read_through_loads_once() {
        let manager = manager();
        let post = post();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let loaded: Result<Post, ()> = manager
                .get_post(post.id, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(post.clone())
                })
                .await;
            assert_eq!(loaded, Ok(post.clone()));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loader_errors_are_forwarded_and_not_cached() {
        let manager = manager();
        let id = PostId::new();
        let first: Result<Post, &str> = manager.get_post(id, || async { Err("boom") }).await;
        assert_eq!(first, Err("boom"));
        assert!(!manager.cache().h_exists("posts", &id.to_string()).await);
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss_and_dropped() {
        let manager = manager();
        let post = post();
        manager
            .cache()
            .h_set("posts", &post.id.to_string(), "{not json")
            .await;

        let loaded: Result<Post, ()> = manager.get_post(post.id, || async { Ok(post.clone()) }).await;
        assert_eq!(loaded, Ok(post.clone()));
        let cached = manager.cache().h_get("posts", &post.id.to_string()).await;
        assert_eq!(cached, serde_json::to_string(&post).ok());
    }

    #[tokio::test]
    async fn patch_skips_absent_entries() {
        let manager = manager();
        let post_id = PostId::new();
        manager
            .record(Mutation::PostLiked {
                post_id,
                user_id: UserId::new(),
            })
            .await;
        assert!(!manager.cache().h_exists("posts", &post_id.to_string()).await);
    }

    #[tokio::test]
    async fn unresolved_patch_drops_entry() {
        let manager = manager();
        let post = post();
        manager.record(Mutation::PostCreated { post: post.clone() }).await;
        manager
            .record(Mutation::CommentLiked {
                post_id: post.id,
                comment_id: CommentId::new(),
                user_id: UserId::new(),
            })
            .await;
        assert!(!manager.cache().h_exists("posts", &post.id.to_string()).await);
    }

    #[tokio::test]
    async fn cached_post_keeps_insertion_order_but_reads_ranked() {
        let manager = manager();
        let mut post = post();
        let author = post.author.clone();
        let first = Comment::new(author.clone(), "first", datetime!(2025-06-01 8:00 UTC)).expect("comment");
        let second = Comment::new(author, "second", datetime!(2025-06-01 9:00 UTC)).expect("comment");
        post.comments = vec![first.clone(), second.clone()];
        manager.record(Mutation::PostCreated { post: post.clone() }).await;

        manager
            .record(Mutation::CommentLiked {
                post_id: post.id,
                comment_id: second.id,
                user_id: UserId::new(),
            })
            .await;

        let raw = manager
            .cache()
            .h_get("posts", &post.id.to_string())
            .await
            .expect("cached");
        let stored: Post = serde_json::from_str(&raw).expect("decode");
        assert_eq!(stored.comments[0].id, first.id);

        let read: Result<Post, ()> = manager.get_post(post.id, || async { Err(()) }).await;
        let read = read.expect("cached read");
        assert_eq!(read.comments[0].id, second.id);
    }

    #[tokio::test]
    async fn structural_change_drops_every_page() {
        let manager = manager();
        manager.cache().h_set(POST_PAGES_HASH, "page_1", "{}").await;
        manager.cache().h_set(POST_PAGES_HASH, "page_2", "{}").await;
        manager.record(Mutation::PostDeleted { post_id: PostId::new() }).await;
        assert!(!manager.cache().h_exists(POST_PAGES_HASH, "page_1").await);
        assert!(!manager.cache().h_exists(POST_PAGES_HASH, "page_2").await);
    }

    #[tokio::test]
    async fn pets_refresh_replaces_entry() {
        let manager = manager();
        let user_id = UserId::new();
        manager.cache().set(&format!("pets:{user_id}"), "[{\"stale\":true}]").await;
        manager
            .record(Mutation::PetsChanged {
                user_id,
                pets: Vec::new(),
            })
            .await;
        let pets: Result<Vec<Pet>, ()> = manager.get_pets(user_id, || async { Err(()) }).await;
        assert_eq!(pets, Ok(Vec::new()));
    }
}
