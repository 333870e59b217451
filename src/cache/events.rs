//! Mutations reported to the coherence manager once the store write succeeded.

use std::fmt;

use crate::domain::{
    ids::{CommentId, PostId, UserId},
    pets::Pet,
    posts::{Comment, Post},
};

/// A successful store mutation, carrying what the cache needs to follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A post was inserted.
    PostCreated { post: Post },
    /// A post's own fields changed.
    PostEdited { post_id: PostId },
    PostDeleted { post_id: PostId },
    CommentAdded { post_id: PostId, comment: Comment },
    CommentEdited {
        post_id: PostId,
        comment_id: CommentId,
        text: String,
    },
    CommentDeleted {
        post_id: PostId,
        comment_id: CommentId,
    },
    PostLiked { post_id: PostId, user_id: UserId },
    PostUnliked { post_id: PostId, user_id: UserId },
    CommentLiked {
        post_id: PostId,
        comment_id: CommentId,
        user_id: UserId,
    },
    CommentUnliked {
        post_id: PostId,
        comment_id: CommentId,
        user_id: UserId,
    },
    /// Any change to a user's pets; `pets` is the re-fetched list.
    PetsChanged { user_id: UserId, pets: Vec<Pet> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    PostCreated,
    PostEdited,
    PostDeleted,
    CommentAdded,
    CommentEdited,
    CommentDeleted,
    PostLiked,
    PostUnliked,
    CommentLiked,
    CommentUnliked,
    PetsChanged,
}

impl MutationKind {
    pub const ALL: [MutationKind; 11] = [
        MutationKind::PostCreated,
        MutationKind::PostEdited,
        MutationKind::PostDeleted,
        MutationKind::CommentAdded,
        MutationKind::CommentEdited,
        MutationKind::CommentDeleted,
        MutationKind::PostLiked,
        MutationKind::PostUnliked,
        MutationKind::CommentLiked,
        MutationKind::CommentUnliked,
        MutationKind::PetsChanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::PostCreated => "post_created",
            MutationKind::PostEdited => "post_edited",
            MutationKind::PostDeleted => "post_deleted",
            MutationKind::CommentAdded => "comment_added",
            MutationKind::CommentEdited => "comment_edited",
            MutationKind::CommentDeleted => "comment_deleted",
            MutationKind::PostLiked => "post_liked",
            MutationKind::PostUnliked => "post_unliked",
            MutationKind::CommentLiked => "comment_liked",
            MutationKind::CommentUnliked => "comment_unliked",
            MutationKind::PetsChanged => "pets_changed",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::PostCreated { .. } => MutationKind::PostCreated,
            Mutation::PostEdited { .. } => MutationKind::PostEdited,
            Mutation::PostDeleted { .. } => MutationKind::PostDeleted,
            Mutation::CommentAdded { .. } => MutationKind::CommentAdded,
            Mutation::CommentEdited { .. } => MutationKind::CommentEdited,
            Mutation::CommentDeleted { .. } => MutationKind::CommentDeleted,
            Mutation::PostLiked { .. } => MutationKind::PostLiked,
            Mutation::PostUnliked { .. } => MutationKind::PostUnliked,
            Mutation::CommentLiked { .. } => MutationKind::CommentLiked,
            Mutation::CommentUnliked { .. } => MutationKind::CommentUnliked,
            Mutation::PetsChanged { .. } => MutationKind::PetsChanged,
        }
    }

    /// The post whose cache entry the mutation concerns, if any.
    pub fn post_id(&self) -> Option<PostId> {
        match self {
            Mutation::PostCreated { post } => Some(post.id),
            Mutation::PostEdited { post_id }
            | Mutation::PostDeleted { post_id }
            | Mutation::CommentAdded { post_id, .. }
            | Mutation::CommentEdited { post_id, .. }
            | Mutation::CommentDeleted { post_id, .. }
            | Mutation::PostLiked { post_id, .. }
            | Mutation::PostUnliked { post_id, .. }
            | Mutation::CommentLiked { post_id, .. }
            | Mutation::CommentUnliked { post_id, .. } => Some(*post_id),
            Mutation::PetsChanged { .. } => None,
        }
    }

    pub fn pets_owner(&self) -> Option<UserId> {
        match self {
            Mutation::PetsChanged { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn kind_labels_are_unique() {
        let labels: HashSet<_> = MutationKind::ALL.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(labels.len(), MutationKind::ALL.len());
    }

    #[test]
    fn post_and_owner_ids_are_exposed() {
        let post_id = PostId::new();
        let user_id = UserId::new();
        let liked = Mutation::PostLiked { post_id, user_id };
        assert_eq!(liked.kind(), MutationKind::PostLiked);
        assert_eq!(liked.post_id(), Some(post_id));
        assert_eq!(liked.pets_owner(), None);

        let pets = Mutation::PetsChanged {
            user_id,
            pets: Vec::new(),
        };
        assert_eq!(pets.post_id(), None);
        assert_eq!(pets.pets_owner(), Some(user_id));
    }
}
