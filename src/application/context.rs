//! Dependency-injected bundle of the feed repositories.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{
        comments::CommentRepository, likes::LikeRepository, pets::PetRepository,
        posts::PostRepository, store::DocumentStore, users::UserRepository,
    },
    cache::{CacheConfig, CoherenceManager, FailOpenCache},
};

#[derive(Clone)]
pub struct FeedContext {
    pub posts: PostRepository,
    pub comments: CommentRepository,
    pub likes: LikeRepository,
    pub pets: PetRepository,
    pub users: UserRepository,
    store: Arc<dyn DocumentStore>,
    coherence: Arc<CoherenceManager>,
}

impl FeedContext {
    pub fn new(store: Arc<dyn DocumentStore>, cache: FailOpenCache, config: &CacheConfig) -> Self {
        let coherence = Arc::new(CoherenceManager::new(cache, config));
        Self {
            posts: PostRepository::new(Arc::clone(&store), Arc::clone(&coherence)),
            comments: CommentRepository::new(Arc::clone(&store), Arc::clone(&coherence)),
            likes: LikeRepository::new(Arc::clone(&store), Arc::clone(&coherence)),
            pets: PetRepository::new(Arc::clone(&store), Arc::clone(&coherence)),
            users: UserRepository::new(Arc::clone(&store)),
            store,
            coherence,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn coherence(&self) -> &Arc<CoherenceManager> {
        &self.coherence
    }

    /// Closes the cache backend and the store, in that order.
    pub async fn shutdown(&self) {
        self.coherence.close().await;
        self.store.close().await;
        info!("feed context shut down");
    }
}
