//! Comment repository: comments embedded in posts, and their likes.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    application::{
        error::FeedError,
        posts::{ensure_post_exists, load_post},
        store::{
            Collection, Document, DocumentStore, FieldPath, Projection, PullMatcher, UpdateOp,
            UpdateOutcome, from_document, to_value,
        },
    },
    cache::{CoherenceManager, Mutation},
    domain::{
        ids::{CommentId, PostId, UserId},
        posts::{Author, Comment, LikeStatus, Post},
        validation,
    },
};

const COMMENTS_FIELD: &str = "comments";

#[derive(Clone)]
pub struct CommentRepository {
    store: Arc<dyn DocumentStore>,
    coherence: Arc<CoherenceManager>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn DocumentStore>, coherence: Arc<CoherenceManager>) -> Self {
        Self { store, coherence }
    }

    pub async fn post_comment(
        &self,
        post_id: PostId,
        author: &Author,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let comment = Comment::new(author.clone(), text, OffsetDateTime::now_utc())?;
        ensure_post_exists(self.store.as_ref(), post_id).await?;

        let outcome = self
            .update(
                post_id,
                UpdateOp::Push {
                    path: FieldPath::field(COMMENTS_FIELD),
                    value: to_value(&comment)?,
                },
            )
            .await?;
        expect_matched(outcome, "comment could not be posted")?;
        info!(post_id = %post_id, comment_id = %comment.id, "comment posted");

        self.coherence
            .record(Mutation::CommentAdded {
                post_id,
                comment: comment.clone(),
            })
            .await;
        Ok(comment)
    }

    /// Reads one comment straight from the store.
    pub async fn get_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<Comment, FeedError> {
        let document = self
            .store
            .find_by_id(
                Collection::Posts,
                &post_id.to_string(),
                Some(&Projection::fields([COMMENTS_FIELD])),
            )
            .await?
            .ok_or_else(|| FeedError::not_found("post"))?;
        comments_of(document)?
            .into_iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| FeedError::not_found("comment"))
    }

    pub async fn edit_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let text = validation::required_text("text", text)?;
        self.get_comment(post_id, comment_id).await?;

        let outcome = self
            .update(
                post_id,
                UpdateOp::Set {
                    path: FieldPath::element(COMMENTS_FIELD, comment_id, "text"),
                    value: Value::String(text.clone()),
                },
            )
            .await?;
        expect_matched(outcome, "comment vanished during edit")?;
        info!(post_id = %post_id, comment_id = %comment_id, "comment edited");

        self.coherence
            .record(Mutation::CommentEdited {
                post_id,
                comment_id,
                text,
            })
            .await;
        self.get_comment(post_id, comment_id).await
    }

    /// Removes the comment and returns the re-fetched post.
    pub async fn delete_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<Post, FeedError> {
        self.get_comment(post_id, comment_id).await?;

        let outcome = self
            .update(
                post_id,
                UpdateOp::Pull {
                    path: FieldPath::field(COMMENTS_FIELD),
                    matcher: PullMatcher::Id(comment_id.to_string()),
                },
            )
            .await?;
        if outcome.modified == 0 {
            return Err(FeedError::internal("comment could not be deleted"));
        }
        info!(post_id = %post_id, comment_id = %comment_id, "comment deleted");

        self.coherence
            .record(Mutation::CommentDeleted {
                post_id,
                comment_id,
            })
            .await;
        Ok(load_post(self.store.as_ref(), post_id).await?.ranked())
    }

    pub async fn like_comment(
        &self,
        user: UserId,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<LikeStatus, FeedError> {
        self.get_comment(post_id, comment_id).await?;
        let outcome = self
            .update(
                post_id,
                UpdateOp::AddToSet {
                    path: FieldPath::element(COMMENTS_FIELD, comment_id, "likes"),
                    value: to_value(&user)?,
                },
            )
            .await?;
        expect_matched(outcome, "comment vanished before it could be liked")?;

        if outcome.modified > 0 {
            self.coherence
                .record(Mutation::CommentLiked {
                    post_id,
                    comment_id,
                    user_id: user,
                })
                .await;
        } else {
            debug!(post_id = %post_id, comment_id = %comment_id, user_id = %user, "comment already liked");
        }
        self.like_status(post_id, comment_id, user).await
    }

    pub async fn unlike_comment(
        &self,
        user: UserId,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<LikeStatus, FeedError> {
        self.get_comment(post_id, comment_id).await?;
        let outcome = self
            .update(
                post_id,
                UpdateOp::Pull {
                    path: FieldPath::element(COMMENTS_FIELD, comment_id, "likes"),
                    matcher: PullMatcher::Value(to_value(&user)?),
                },
            )
            .await?;
        expect_matched(outcome, "comment vanished before it could be unliked")?;

        if outcome.modified > 0 {
            self.coherence
                .record(Mutation::CommentUnliked {
                    post_id,
                    comment_id,
                    user_id: user,
                })
                .await;
        } else {
            debug!(post_id = %post_id, comment_id = %comment_id, user_id = %user, "comment was not liked");
        }
        self.like_status(post_id, comment_id, user).await
    }

    async fn like_status(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        user: UserId,
    ) -> Result<LikeStatus, FeedError> {
        let comment = self.get_comment(post_id, comment_id).await?;
        Ok(LikeStatus {
            liked: comment.is_liked_by(user),
            likes_len: comment.likes_len(),
        })
    }

    async fn update(&self, post_id: PostId, op: UpdateOp) -> Result<UpdateOutcome, FeedError> {
        Ok(self
            .store
            .update_one(Collection::Posts, &post_id.to_string(), &[op])
            .await?)
    }
}

fn expect_matched(outcome: UpdateOutcome, message: &str) -> Result<(), FeedError> {
    if outcome.matched == 0 {
        return Err(FeedError::internal(message));
    }
    Ok(())
}

/// Decodes the `comments` projection of a post document.
fn comments_of(document: Document) -> Result<Vec<Comment>, FeedError> {
    #[derive(Deserialize)]
    struct Comments {
        #[serde(default)]
        comments: Vec<Comment>,
    }
    Ok(from_document::<Comments>(document)?.comments)
}
