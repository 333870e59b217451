//! Post repository: feed pages, single posts, search and post lifecycle.

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::{
        error::FeedError,
        store::{
            Collection, DocumentStore, FieldPath, FindOptions, ID_FIELD, Projection, UpdateOp,
            from_document, to_document,
        },
    },
    cache::{CoherenceManager, Mutation},
    domain::{
        ids::{PostId, UserId},
        posts::{Author, DeletedPost, POST_PAGE_SIZE, Post, PostDraft, PostPage},
    },
};

#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn DocumentStore>,
    coherence: Arc<CoherenceManager>,
}

impl PostRepository {
    pub fn new(store: Arc<dyn DocumentStore>, coherence: Arc<CoherenceManager>) -> Self {
        Self { store, coherence }
    }

    pub async fn create_post(
        &self,
        author: &Author,
        title: &str,
        description: &str,
        image: Option<&str>,
    ) -> Result<Post, FeedError> {
        let draft = PostDraft::new(title, description, image)?;
        let post = Post::new(author.clone(), draft, OffsetDateTime::now_utc());
        self.store
            .insert_one(Collection::Posts, to_document(&post)?)
            .await?;
        info!(post_id = %post.id, author_id = %author.id, "post created");

        self.coherence
            .record(Mutation::PostCreated { post: post.clone() })
            .await;
        Ok(post)
    }

    /// Replaces title and description. `image: None` keeps the current image.
    /// Author, comments and likes are preserved.
    pub async fn edit_post(
        &self,
        id: PostId,
        title: &str,
        description: &str,
        image: Option<&str>,
    ) -> Result<Post, FeedError> {
        let draft = PostDraft::new(title, description, image)?;
        ensure_post_exists(self.store.as_ref(), id).await?;

        let mut ops = vec![
            UpdateOp::Set {
                path: FieldPath::field("title"),
                value: Value::String(draft.title),
            },
            UpdateOp::Set {
                path: FieldPath::field("description"),
                value: Value::String(draft.description),
            },
        ];
        if let Some(image) = draft.image {
            ops.push(UpdateOp::Set {
                path: FieldPath::field("image"),
                value: Value::String(image),
            });
        }

        let outcome = self
            .store
            .update_one(Collection::Posts, &id.to_string(), &ops)
            .await?;
        if outcome.matched == 0 {
            return Err(FeedError::internal(format!("post {id} vanished during edit")));
        }

        let post = load_post(self.store.as_ref(), id).await?;
        info!(post_id = %id, modified = outcome.modified, "post edited");
        self.coherence
            .record(Mutation::PostEdited { post_id: id })
            .await;
        Ok(post.ranked())
    }

    pub async fn delete_post(&self, id: PostId) -> Result<DeletedPost, FeedError> {
        let deleted = self
            .store
            .delete_by_id(Collection::Posts, &id.to_string())
            .await?;
        if deleted == 0 {
            return Err(FeedError::not_found("post"));
        }
        info!(post_id = %id, "post deleted");

        self.coherence
            .record(Mutation::PostDeleted { post_id: id })
            .await;
        Ok(DeletedPost {
            post_id: id,
            deleted: true,
        })
    }

    /// Full post with comments ranked by descending like count.
    pub async fn get_post(&self, id: PostId) -> Result<Post, FeedError> {
        self.coherence
            .get_post(id, || load_post(self.store.as_ref(), id))
            .await
    }

    /// Newest-first listing, [`POST_PAGE_SIZE`] posts per page, 1-based.
    pub async fn get_page(&self, page: u32) -> Result<PostPage, FeedError> {
        if page < 1 {
            return Err(FeedError::invalid("page must be at least 1"));
        }
        self.coherence
            .get_page(page, || load_page(self.store.as_ref(), page))
            .await
    }

    /// Case-insensitive substring search over title and description, newest
    /// first. A blank keyword matches every post.
    pub async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>, FeedError> {
        let needle = keyword.trim().to_lowercase();
        let posts = scan_posts(self.store.as_ref()).await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.matches_keyword(&needle))
            .map(Post::ranked)
            .collect())
    }

    pub async fn posts_by_author(
        &self,
        author: UserId,
        keyword: Option<&str>,
    ) -> Result<Vec<Post>, FeedError> {
        let needle = keyword.map(|keyword| keyword.trim().to_lowercase());
        let posts = scan_posts(self.store.as_ref()).await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.author.id == author)
            .filter(|post| needle.as_deref().is_none_or(|needle| post.matches_keyword(needle)))
            .map(Post::ranked)
            .collect())
    }
}

/// Reads a post straight from the store, comments in insertion order.
pub(crate) async fn load_post(store: &dyn DocumentStore, id: PostId) -> Result<Post, FeedError> {
    let document = store
        .find_by_id(Collection::Posts, &id.to_string(), None)
        .await?
        .ok_or_else(|| FeedError::not_found("post"))?;
    Ok(from_document(document)?)
}

pub(crate) async fn ensure_post_exists(store: &dyn DocumentStore, id: PostId) -> Result<(), FeedError> {
    store
        .find_by_id(
            Collection::Posts,
            &id.to_string(),
            Some(&Projection::fields([ID_FIELD])),
        )
        .await?
        .map(|_| ())
        .ok_or_else(|| FeedError::not_found("post"))
}

async fn load_page(store: &dyn DocumentStore, page: u32) -> Result<PostPage, FeedError> {
    let total_posts = store.count(Collection::Posts).await?;
    let skip = u64::from(page - 1) * u64::from(POST_PAGE_SIZE);
    let documents = store
        .find(
            Collection::Posts,
            &FindOptions::newest_first().page(skip, u64::from(POST_PAGE_SIZE)),
        )
        .await?;
    if documents.is_empty() && page > 1 {
        return Err(FeedError::not_found("page"));
    }

    let posts = documents
        .into_iter()
        .map(|document| from_document::<Post>(document).map(|post| post.summary()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PostPage {
        page,
        page_size: POST_PAGE_SIZE,
        total_posts,
        total_pages: PostPage::total_pages_for(total_posts),
        posts,
    })
}

async fn scan_posts(store: &dyn DocumentStore) -> Result<Vec<Post>, FeedError> {
    store
        .find(Collection::Posts, &FindOptions::newest_first())
        .await?
        .into_iter()
        .map(|document| from_document::<Post>(document).map_err(FeedError::from))
        .collect()
}
