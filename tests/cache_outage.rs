//! With every cache call failing, the feed keeps working straight off the store.

use std::sync::Arc;

use petopia::{
    application::{context::FeedContext, seed},
    cache::{CacheConfig, FailOpenCache},
    domain::{
        ids::UserId,
        pets::{PetChanges, PetDraft},
        posts::Author,
    },
    infra::memory::MemoryDocumentStore,
};

fn offline_context() -> FeedContext {
    FeedContext::new(
        Arc::new(MemoryDocumentStore::new()),
        FailOpenCache::offline(),
        &CacheConfig::default(),
    )
}

#[tokio::test]
async fn every_operation_succeeds_without_a_cache() {
    let ctx = offline_context();
    let owner = Author::new(UserId::new(), "owner").expect("author");

    let post = ctx
        .posts
        .create_post(&owner, "Staring problem", "Walls", None)
        .await
        .expect("create");
    let comment = ctx
        .comments
        .post_comment(post.id, &owner, "first")
        .await
        .expect("comment");
    ctx.comments
        .like_comment(UserId::new(), post.id, comment.id)
        .await
        .expect("like comment");
    ctx.likes
        .like_post(UserId::new(), post.id)
        .await
        .expect("like post");
    ctx.comments
        .edit_comment(post.id, comment.id, "edited")
        .await
        .expect("edit comment");

    let fetched = ctx.posts.get_post(post.id).await.expect("get");
    assert_eq!(fetched.likes_len(), 1);
    assert_eq!(fetched.comments[0].text, "edited");
    assert_eq!(fetched.comments[0].likes_len(), 1);

    let edited = ctx
        .posts
        .edit_post(post.id, "Still staring", "Walls", None)
        .await
        .expect("edit");
    assert_eq!(edited.title, "Still staring");
    assert_eq!(ctx.posts.get_page(1).await.expect("page").posts[0].title, "Still staring");
    assert_eq!(ctx.posts.search_posts("still").await.expect("search").len(), 1);

    ctx.posts.delete_post(post.id).await.expect("delete");
    assert!(ctx.posts.get_post(post.id).await.is_err());
}

#[tokio::test]
async fn pets_work_without_a_cache() {
    let ctx = offline_context();
    let user = ctx
        .users
        .create_user("owner@example.com")
        .await
        .expect("user");
    let pet = ctx
        .pets
        .create_pet(
            user.id,
            PetDraft::new("Samu", 3, "dog", "corgi", None).expect("draft"),
        )
        .await
        .expect("create pet");

    let renamed = ctx
        .pets
        .update_pet(
            user.id,
            pet.id,
            PetChanges {
                name: Some("Samuuu".to_string()),
                ..PetChanges::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.name, "Samuuu");
    assert_eq!(ctx.pets.list_pets(user.id).await.expect("list").len(), 1);
}

#[tokio::test]
async fn seeding_completes_without_a_cache() {
    let ctx = offline_context();
    let report = seed::seed_demo(&ctx).await.expect("seed");
    assert_eq!(report.posts, 4);

    let page = ctx.posts.get_page(1).await.expect("page");
    assert_eq!(page.posts.len(), 4);
}
