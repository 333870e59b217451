pub mod comments;
pub mod context;
pub mod error;
pub mod likes;
pub mod pets;
pub mod posts;
pub mod seed;
pub mod store;
pub mod users;
