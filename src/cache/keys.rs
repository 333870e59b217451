//! Cache key layout.
//!
//! Posts and listing pages live as fields of two hashes so that a single
//! `delete` drops every page at once. Pet lists are plain keys with a TTL.

use std::fmt;

use crate::domain::ids::{PostId, UserId};

/// Hash holding one field per cached post, keyed by post id.
pub const POSTS_HASH: &str = "posts";
/// Hash holding one field per cached feed page, keyed `page_{n}`.
pub const POST_PAGES_HASH: &str = "community_posts_pages";
const PETS_KEY_PREFIX: &str = "pets:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Post(PostId),
    PostPage(u32),
    UserPets(UserId),
}

/// Where a [`CacheKey`] lives in the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    Field { key: &'static str, field: String },
    Key(String),
}

impl CacheKey {
    pub fn location(&self) -> CacheLocation {
        match self {
            CacheKey::Post(id) => CacheLocation::Field {
                key: POSTS_HASH,
                field: id.to_string(),
            },
            CacheKey::PostPage(page) => CacheLocation::Field {
                key: POST_PAGES_HASH,
                field: format!("page_{page}"),
            },
            CacheKey::UserPets(user) => CacheLocation::Key(format!("{PETS_KEY_PREFIX}{user}")),
        }
    }

    /// Metric label for the kind of entry.
    pub fn entry(&self) -> &'static str {
        match self {
            CacheKey::Post(_) => "post",
            CacheKey::PostPage(_) => "page",
            CacheKey::UserPets(_) => "pets",
        }
    }
}

impl fmt::Display for CacheLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheLocation::Field { key, field } => write!(f, "{key}[{field}]"),
            CacheLocation::Key(key) => f.write_str(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn posts_and_pages_are_hash_fields() {
        let id = PostId::from_uuid(Uuid::nil());
        assert_eq!(
            CacheKey::Post(id).location(),
            CacheLocation::Field {
                key: "posts",
                field: "00000000-0000-0000-0000-000000000000".into(),
            }
        );
        assert_eq!(
            CacheKey::PostPage(3).location().to_string(),
            "community_posts_pages[page_3]"
        );
    }

    #[test]
    fn pets_are_plain_keys_per_user() {
        let user = UserId::from_uuid(Uuid::nil());
        assert_eq!(
            CacheKey::UserPets(user).location(),
            CacheLocation::Key("pets:00000000-0000-0000-0000-000000000000".into())
        );
        assert_eq!(CacheKey::UserPets(user).entry(), "pets");
    }
}
