//! Posts with their embedded comments and likes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    error::DomainError,
    ids::{CommentId, PostId, UserId},
    validation,
};

/// Number of posts per community feed page.
pub const POST_PAGE_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
}

impl Author {
    pub fn new(id: UserId, username: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            username: validation::username(username)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: Author,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub likes: Vec<UserId>,
}

impl Comment {
    pub fn new(author: Author, text: &str, now: OffsetDateTime) -> Result<Self, DomainError> {
        Ok(Self {
            id: CommentId::new(),
            author,
            text: validation::required_text("text", text)?,
            created_at: now,
            likes: Vec::new(),
        })
    }

    pub fn likes_len(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.contains(&user)
    }
}

/// Validated editable fields of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

impl PostDraft {
    pub fn new(title: &str, description: &str, image: Option<&str>) -> Result<Self, DomainError> {
        Ok(Self {
            title: validation::title(title)?,
            description: validation::required_text("description", description)?,
            image: validation::optional_text(image),
        })
    }
}

/// Full post document.
///
/// `comments` is kept in insertion order; callers that present a post use
/// [`Post::ranked`] to order comments by popularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: Author,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub likes: Vec<UserId>,
}

impl Post {
    pub fn new(author: Author, draft: PostDraft, now: OffsetDateTime) -> Self {
        Self {
            id: PostId::new(),
            author,
            title: draft.title,
            description: draft.description,
            image: draft.image,
            created_at: now,
            comments: Vec::new(),
            likes: Vec::new(),
        }
    }

    /// Orders comments by descending like count. The sort is stable, so equally
    /// liked comments keep their insertion order.
    pub fn ranked(mut self) -> Self {
        self.comments
            .sort_by(|left, right| right.likes.len().cmp(&left.likes.len()));
        self
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|comment| comment.id == id)
    }

    pub fn likes_len(&self) -> usize {
        self.likes.len()
    }

    /// Case-insensitive substring match over title and description.
    /// `needle` must already be lowercase.
    pub fn matches_keyword(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id,
            author: self.author.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            created_at: self.created_at,
        }
    }
}

/// Listing shape of a post: no comment or like detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: PostId,
    pub author: Author,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub page: u32,
    pub page_size: u32,
    pub total_posts: u64,
    pub total_pages: u64,
    pub posts: Vec<PostSummary>,
}

impl PostPage {
    pub fn total_pages_for(total_posts: u64) -> u64 {
        total_posts.div_ceil(u64::from(POST_PAGE_SIZE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPost {
    pub post_id: PostId,
    pub deleted: bool,
}
