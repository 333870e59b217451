//! User accounts. Only what the feed and pet records need: id and email.

use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::{
        error::FeedError,
        store::{Collection, DocumentStore, FindOptions, StoreError, from_document, to_document},
    },
    domain::{ids::UserId, pets::User, validation},
};

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Registers an email. Emails are compared case-insensitively.
    pub async fn create_user(&self, email: &str) -> Result<User, FeedError> {
        let email = validation::email(email)?;
        if self.find_by_email(&email).await?.is_some() {
            return Err(FeedError::invalid("email is already registered"));
        }

        let user = User::new(&email, OffsetDateTime::now_utc())?;
        match self
            .store
            .insert_one(Collection::Users, to_document(&user)?)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                return Err(FeedError::invalid("user already exists"));
            }
            Err(err) => return Err(err.into()),
        }
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, FeedError> {
        let document = self
            .store
            .find_by_id(Collection::Users, &id.to_string(), None)
            .await?
            .ok_or_else(|| FeedError::not_found("user"))?;
        Ok(from_document(document)?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserId>, FeedError> {
        #[derive(Deserialize)]
        struct Account {
            id: UserId,
            email: String,
        }

        let needle = email.trim().to_lowercase();
        for document in self
            .store
            .find(Collection::Users, &FindOptions::default())
            .await?
        {
            let account: Account = from_document(document)?;
            if account.email == needle {
                return Ok(Some(account.id));
            }
        }
        Ok(None)
    }
}
