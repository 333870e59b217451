//! Demo content for local development.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::{
    application::{context::FeedContext, error::FeedError, store::Collection},
    domain::{
        pets::PetDraft,
        posts::{Author, Post},
    },
};

struct DemoAccount {
    email: &'static str,
    username: &'static str,
}

const ACCOUNTS: [DemoAccount; 4] = [
    DemoAccount {
        email: "sam.owner@example.com",
        username: "samowner",
    },
    DemoAccount {
        email: "alice@example.com",
        username: "alicet_01",
    },
    DemoAccount {
        email: "michael@example.com",
        username: "mclark",
    },
    DemoAccount {
        email: "priya@example.com",
        username: "priya_s",
    },
];

/// (author index, title, description)
const POSTS: [(usize, &str, &str); 4] = [
    (
        1,
        "Staring problem",
        "My cutie keeps staring without blinking as soon as he sees someone.",
    ),
    (0, "Samuuu...", "He was 7 years old when I lost him. I still miss him."),
    (2, "Kitty kitty...", "Meet my two newly adopted cuties."),
    (
        3,
        "My dog has anxiety issues",
        "Keeps looking out the window and never gets excited.",
    ),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub pets: usize,
    pub posts: usize,
    pub comments: usize,
    pub likes: usize,
}

/// Replaces both collections with demo users, pets, posts, comments and likes,
/// then flushes the cache.
pub async fn seed_demo(ctx: &FeedContext) -> Result<SeedReport, FeedError> {
    for collection in Collection::ALL {
        let removed = ctx.store().delete_all(collection).await?;
        info!(collection = collection.as_str(), removed, "collection cleared");
    }
    let mut report = SeedReport::default();

    let users = try_join_all(
        ACCOUNTS
            .iter()
            .map(|account| ctx.users.create_user(account.email)),
    )
    .await?;
    let mut authors = Vec::with_capacity(users.len());
    for (user, account) in users.iter().zip(&ACCOUNTS) {
        authors.push(Author::new(user.id, account.username)?);
        report.users += 1;
    }

    let sam = PetDraft::new("Sam", 7, "Dog", "Pomeranian", None)?;
    ctx.pets.create_pet(authors[0].id, sam).await?;
    report.pets += 1;

    let mut posts: Vec<Post> = Vec::with_capacity(POSTS.len());
    for (author, title, description) in POSTS {
        posts.push(
            ctx.posts
                .create_post(&authors[author], title, description, None)
                .await?,
        );
        report.posts += 1;
    }

    // Three comments on the first post, liked so that the newest ranks first.
    let staring = posts[0].id;
    let mut comment_ids = Vec::new();
    for (author, text) in [(2, "Mine does that too!"), (3, "Maybe he wants treats"), (0, "So cute")] {
        let comment = ctx
            .comments
            .post_comment(staring, &authors[author], text)
            .await?;
        comment_ids.push(comment.id);
        report.comments += 1;
    }
    for (comment_index, likers) in [(1, &[0][..]), (2, &[1, 3][..])] {
        for &liker in likers {
            ctx.comments
                .like_comment(authors[liker].id, staring, comment_ids[comment_index])
                .await?;
            report.likes += 1;
        }
    }
    for author in &authors[1..] {
        ctx.likes.like_post(author.id, posts[1].id).await?;
        report.likes += 1;
    }

    ctx.coherence().flush().await;
    info!(?report, "demo data seeded");
    Ok(report)
}
