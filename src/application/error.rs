use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::store::StoreError, domain::error::DomainError, infra::error::InfraError};

/// Errors surfaced by the feed repositories. Cache failures never appear here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("internal error: {0}")]
    Internal(String),
}

impl FeedError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FeedError::NotFound { .. })
    }
}

impl From<DomainError> for FeedError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => FeedError::NotFound { entity },
            DomainError::Validation { .. } => FeedError::InvalidArgument(err.to_string()),
            DomainError::Invariant { .. } => FeedError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for FeedError {
    fn from(err: StoreError) -> Self {
        FeedError::Internal(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Feed(FeedError::NotFound { .. }) => 2,
            AppError::Feed(FeedError::InvalidArgument(_)) | AppError::Validation(_) => 3,
            AppError::Infra(InfraError::Configuration { .. }) => 4,
            AppError::Infra(_) | AppError::Feed(FeedError::Internal(_)) | AppError::Unexpected(_) => 1,
        }
    }
}

/// Flattens an error and its sources into display strings, outermost first.
pub fn error_chain(error: &dyn StdError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages
}
