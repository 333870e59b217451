//! Post likes.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    application::{
        error::FeedError,
        posts::ensure_post_exists,
        store::{
            Collection, DocumentStore, FieldPath, Projection, PullMatcher, UpdateOp, from_document,
            to_value,
        },
    },
    cache::{CoherenceManager, Mutation},
    domain::{
        ids::{PostId, UserId},
        posts::LikeStatus,
    },
};

const LIKES_FIELD: &str = "likes";

#[derive(Clone)]
pub struct LikeRepository {
    store: Arc<dyn DocumentStore>,
    coherence: Arc<CoherenceManager>,
}

impl LikeRepository {
    pub fn new(store: Arc<dyn DocumentStore>, coherence: Arc<CoherenceManager>) -> Self {
        Self { store, coherence }
    }

    /// Adds `user` to the post's likes. Liking twice changes nothing.
    pub async fn like_post(&self, user: UserId, post_id: PostId) -> Result<LikeStatus, FeedError> {
        ensure_post_exists(self.store.as_ref(), post_id).await?;
        let op = UpdateOp::AddToSet {
            path: FieldPath::field(LIKES_FIELD),
            value: to_value(&user)?,
        };
        let outcome = self
            .store
            .update_one(Collection::Posts, &post_id.to_string(), &[op])
            .await?;
        if outcome.matched == 0 {
            return Err(FeedError::internal("post vanished before it could be liked"));
        }

        if outcome.modified > 0 {
            info!(post_id = %post_id, user_id = %user, "post liked");
            self.coherence
                .record(Mutation::PostLiked {
                    post_id,
                    user_id: user,
                })
                .await;
        } else {
            debug!(post_id = %post_id, user_id = %user, "post already liked");
        }
        self.like_status(post_id, user).await
    }

    /// Removes `user` from the post's likes. Unliking a non-liker succeeds.
    pub async fn unlike_post(&self, user: UserId, post_id: PostId) -> Result<LikeStatus, FeedError> {
        ensure_post_exists(self.store.as_ref(), post_id).await?;
        let op = UpdateOp::Pull {
            path: FieldPath::field(LIKES_FIELD),
            matcher: PullMatcher::Value(to_value(&user)?),
        };
        let outcome = self
            .store
            .update_one(Collection::Posts, &post_id.to_string(), &[op])
            .await?;
        if outcome.matched == 0 {
            return Err(FeedError::internal("post vanished before it could be unliked"));
        }

        if outcome.modified > 0 {
            info!(post_id = %post_id, user_id = %user, "post unliked");
            self.coherence
                .record(Mutation::PostUnliked {
                    post_id,
                    user_id: user,
                })
                .await;
        } else {
            debug!(post_id = %post_id, user_id = %user, "post was not liked");
        }
        self.like_status(post_id, user).await
    }

    /// Reads the like set back through a `likes` projection.
    pub async fn like_status(&self, post_id: PostId, user: UserId) -> Result<LikeStatus, FeedError> {
        #[derive(Deserialize)]
        struct Likes {
            #[serde(default)]
            likes: Vec<UserId>,
        }

        let document = self
            .store
            .find_by_id(
                Collection::Posts,
                &post_id.to_string(),
                Some(&Projection::fields([LIKES_FIELD])),
            )
            .await?
            .ok_or_else(|| FeedError::not_found("post"))?;
        let Likes { likes } = from_document(document)?;
        Ok(LikeStatus {
            liked: likes.contains(&user),
            likes_len: likes.len(),
        })
    }
}
