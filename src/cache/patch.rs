//! In-place edits of a cached post that mirror the store's update operators.

use crate::domain::{
    ids::{CommentId, UserId},
    posts::{Comment, Post},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPatch {
    AppendComment(Comment),
    SetCommentText { comment_id: CommentId, text: String },
    RemoveComment { comment_id: CommentId },
    AddPostLike { user_id: UserId },
    RemovePostLike { user_id: UserId },
    AddCommentLike { comment_id: CommentId, user_id: UserId },
    RemoveCommentLike { comment_id: CommentId, user_id: UserId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// The cached copy lacks the comment the patch targets and can no longer be
    /// trusted.
    Unresolved,
}

impl PatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchOutcome::Applied => "applied",
            PatchOutcome::Unresolved => "unresolved",
        }
    }
}

impl PostPatch {
    pub fn apply(&self, post: &mut Post) -> PatchOutcome {
        match self {
            PostPatch::AppendComment(comment) => {
                if post.comment(comment.id).is_none() {
                    post.comments.push(comment.clone());
                }
                PatchOutcome::Applied
            }
            PostPatch::SetCommentText { comment_id, text } => {
                match post.comment_mut(*comment_id) {
                    Some(comment) => {
                        comment.text.clone_from(text);
                        PatchOutcome::Applied
                    }
                    None => PatchOutcome::Unresolved,
                }
            }
            PostPatch::RemoveComment { comment_id } => {
                post.comments.retain(|comment| comment.id != *comment_id);
                PatchOutcome::Applied
            }
            PostPatch::AddPostLike { user_id } => {
                add_to_set(&mut post.likes, *user_id);
                PatchOutcome::Applied
            }
            PostPatch::RemovePostLike { user_id } => {
                post.likes.retain(|liker| liker != user_id);
                PatchOutcome::Applied
            }
            PostPatch::AddCommentLike {
                comment_id,
                user_id,
            } => match post.comment_mut(*comment_id) {
                Some(comment) => {
                    add_to_set(&mut comment.likes, *user_id);
                    PatchOutcome::Applied
                }
                None => PatchOutcome::Unresolved,
            },
            PostPatch::RemoveCommentLike {
                comment_id,
                user_id,
            } => match post.comment_mut(*comment_id) {
                Some(comment) => {
                    comment.likes.retain(|liker| liker != user_id);
                    PatchOutcome::Applied
                }
                None => PatchOutcome::Unresolved,
            },
        }
    }
}

fn add_to_set(likes: &mut Vec<UserId>, user: UserId) {
    if !likes.contains(&user) {
        likes.push(user);
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::posts::{Author, PostDraft};

    fn author() -> Author {
        Author::new(UserId::new(), "owner").expect("author")
    }

    fn post_with_comment() -> (Post, CommentId) {
        let draft = PostDraft::new("Zoomies", "Every night at 3am", None).expect("draft");
        let mut post = Post::new(author(), draft, datetime!(2025-04-01 8:00 UTC));
        let comment = Comment::new(author(), "same here", datetime!(2025-04-01 9:00 UTC))
            .expect("comment");
        let id = comment.id;
        post.comments.push(comment);
        (post, id)
    }

    #[test]
    fn likes_behave_as_sets() {
        let (mut post, comment_id) = post_with_comment();
        let user_id = UserId::new();
        for _ in 0..2 {
            PostPatch::AddPostLike { user_id }.apply(&mut post);
            PostPatch::AddCommentLike {
                comment_id,
                user_id,
            }
            .apply(&mut post);
        }
        assert_eq!(post.likes, vec![user_id]);
        assert_eq!(post.comments[0].likes, vec![user_id]);

        PostPatch::RemoveCommentLike {
            comment_id,
            user_id: UserId::new(),
        }
        .apply(&mut post);
        assert_eq!(post.comments[0].likes_len(), 1);
    }

    #[test]
    fn remove_post_like_drops_only_that_user() {
        let (mut post, _) = post_with_comment();
        let (kept, removed) = (UserId::new(), UserId::new());
        PostPatch::AddPostLike { user_id: kept }.apply(&mut post);
        PostPatch::AddPostLike { user_id: removed }.apply(&mut post);

        let outcome = PostPatch::RemovePostLike { user_id: removed }.apply(&mut post);
        assert_eq!(outcome, PatchOutcome::Applied);
        assert_eq!(post.likes, vec![kept]);

        let outcome = PostPatch::RemovePostLike { user_id: removed }.apply(&mut post);
        assert_eq!(outcome, PatchOutcome::Applied);
        assert_eq!(post.likes, vec![kept]);
    }

    #[test]
    fn append_is_idempotent_per_comment_id() {
        let (mut post, comment_id) = post_with_comment();
        let existing = post.comment(comment_id).cloned().expect("comment");
        PostPatch::AppendComment(existing).apply(&mut post);
        assert_eq!(post.comments.len(), 1);
    }

    #[test]
    fn missing_comment_is_unresolved() {
        let (mut post, _) = post_with_comment();
        let outcome = PostPatch::SetCommentText {
            comment_id: CommentId::new(),
            text: "edited".into(),
        }
        .apply(&mut post);
        assert_eq!(outcome, PatchOutcome::Unresolved);
    }

    #[test]
    fn remove_and_edit_comment() {
        let (mut post, comment_id) = post_with_comment();
        PostPatch::SetCommentText {
            comment_id,
            text: "edited".into(),
        }
        .apply(&mut post);
        assert_eq!(post.comments[0].text, "edited");

        PostPatch::RemoveComment { comment_id }.apply(&mut post);
        assert!(post.comments.is_empty());
    }
}
