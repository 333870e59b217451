//! Write-path coherence policy.
//!
//! [`POLICY`] maps each mutation kind to what happens to every cache entry
//! kind. [`CoherencePlan::for_mutation`] turns one mutation into concrete
//! actions by reading its row.

use std::fmt;

use super::{
    events::{Mutation, MutationKind},
    patch::PostPatch,
};
use crate::domain::{
    ids::{PostId, UserId},
    pets::Pet,
    posts::Post,
};

/// Treatment of a single-entity cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRule {
    Untouched,
    /// Write the mutation's snapshot.
    Populate,
    Drop,
    /// Patch the entry in place when it is cached; absent entries stay absent.
    PatchIfPresent,
}

/// Treatment of the listing page entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesRule {
    Untouched,
    DropAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRow {
    pub kind: MutationKind,
    pub post_entry: EntryRule,
    pub pages: PagesRule,
    pub pets_entry: EntryRule,
}

const fn row(
    kind: MutationKind,
    post_entry: EntryRule,
    pages: PagesRule,
    pets_entry: EntryRule,
) -> PolicyRow {
    PolicyRow {
        kind,
        post_entry,
        pages,
        pets_entry,
    }
}

use EntryRule as E;
use MutationKind as K;
use PagesRule as P;

pub const POLICY: &[PolicyRow] = &[
    row(K::PostCreated, E::Populate, P::DropAll, E::Untouched),
    row(K::PostEdited, E::Drop, P::DropAll, E::Untouched),
    row(K::PostDeleted, E::Drop, P::DropAll, E::Untouched),
    row(K::CommentAdded, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::CommentEdited, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::CommentDeleted, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::PostLiked, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::PostUnliked, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::CommentLiked, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::CommentUnliked, E::PatchIfPresent, P::Untouched, E::Untouched),
    row(K::PetsChanged, E::Untouched, P::Untouched, E::Populate),
];

/// Row used for a kind missing from [`POLICY`]: drop whatever it might touch.
const FALLBACK: PolicyRow = row(K::PostDeleted, E::Drop, P::DropAll, E::Drop);

pub fn policy_for(kind: MutationKind) -> &'static PolicyRow {
    POLICY
        .iter()
        .find(|row| row.kind == kind)
        .unwrap_or(&FALLBACK)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAction {
    Populate(Box<Post>),
    Drop,
    Patch(PostPatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetsAction {
    Populate(Vec<Pet>),
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoherencePlan {
    pub kind: MutationKind,
    pub post: Option<(PostId, PostAction)>,
    pub drop_pages: bool,
    pub pets: Option<(UserId, PetsAction)>,
}

impl CoherencePlan {
    pub fn for_mutation(mutation: Mutation) -> Self {
        let kind = mutation.kind();
        let policy = policy_for(kind);
        let post_id = mutation.post_id();
        let pets_owner = mutation.pets_owner();
        let (snapshot, patch, pets) = split_payload(mutation);

        let post = post_id.and_then(|id| {
            let action = match policy.post_entry {
                E::Untouched => return None,
                E::Populate => snapshot.map_or(PostAction::Drop, PostAction::Populate),
                E::Drop => PostAction::Drop,
                E::PatchIfPresent => patch.map_or(PostAction::Drop, PostAction::Patch),
            };
            Some((id, action))
        });

        let pets = pets_owner.and_then(|owner| {
            let action = match policy.pets_entry {
                E::Untouched => return None,
                E::Populate => pets.map_or(PetsAction::Drop, PetsAction::Populate),
                E::Drop | E::PatchIfPresent => PetsAction::Drop,
            };
            Some((owner, action))
        });

        Self {
            kind,
            post,
            drop_pages: policy.pages == P::DropAll,
            pets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.post.is_none() && !self.drop_pages && self.pets.is_none()
    }
}

fn split_payload(mutation: Mutation) -> (Option<Box<Post>>, Option<PostPatch>, Option<Vec<Pet>>) {
    match mutation {
        Mutation::PostCreated { post } => (Some(Box::new(post)), None, None),
        Mutation::PostEdited { .. } | Mutation::PostDeleted { .. } => (None, None, None),
        Mutation::CommentAdded { comment, .. } => {
            (None, Some(PostPatch::AppendComment(comment)), None)
        }
        Mutation::CommentEdited {
            comment_id, text, ..
        } => (
            None,
            Some(PostPatch::SetCommentText { comment_id, text }),
            None,
        ),
        Mutation::CommentDeleted { comment_id, .. } => {
            (None, Some(PostPatch::RemoveComment { comment_id }), None)
        }
        Mutation::PostLiked { user_id, .. } => (None, Some(PostPatch::AddPostLike { user_id }), None),
        Mutation::PostUnliked { user_id, .. } => {
            (None, Some(PostPatch::RemovePostLike { user_id }), None)
        }
        Mutation::CommentLiked {
            comment_id,
            user_id,
            ..
        } => (
            None,
            Some(PostPatch::AddCommentLike {
                comment_id,
                user_id,
            }),
            None,
        ),
        Mutation::CommentUnliked {
            comment_id,
            user_id,
            ..
        } => (
            None,
            Some(PostPatch::RemoveCommentLike {
                comment_id,
                user_id,
            }),
            None,
        ),
        Mutation::PetsChanged { pets, .. } => (None, None, Some(pets)),
    }
}

impl fmt::Display for CoherencePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let post = match &self.post {
            None => "untouched",
            Some((_, PostAction::Populate(_))) => "populate",
            Some((_, PostAction::Drop)) => "drop",
            Some((_, PostAction::Patch(_))) => "patch",
        };
        let pets = match &self.pets {
            None => "untouched",
            Some((_, PetsAction::Populate(_))) => "populate",
            Some((_, PetsAction::Drop)) => "drop",
        };
        write!(
            f,
            "CoherencePlan {{ kind: {}, post: {post}, drop_pages: {}, pets: {pets} }}",
            self.kind, self.drop_pages
        )
    }
}
