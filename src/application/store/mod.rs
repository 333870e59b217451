//! Document store contract: two collections of JSON documents with atomic
//! single-document update operators.

mod update;

pub use update::{apply_update, project};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// A stored document. Every document carries its identifier under [`ID_FIELD`].
pub type Document = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Posts,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Users, Collection::Posts];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("document `{id}` already exists")]
    Duplicate { id: String },
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
    #[error("document serialization failed: {0}")]
    Serialization(String),
    #[error("document store timeout")]
    Timeout,
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Insertion order.
    #[default]
    Natural,
    /// Newest first.
    ReverseNatural,
}

/// Top-level fields to return; the id is always included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection(Vec<String>);

impl Projection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, field: &str) -> bool {
        field == ID_FIELD || self.0.iter().any(|candidate| candidate == field)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub order: SortOrder,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn newest_first() -> Self {
        Self {
            order: SortOrder::ReverseNatural,
            ..Self::default()
        }
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Address of an update target inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// A top-level field.
    Field(String),
    /// `field` of the element of array `array` whose `id` equals `element_id`.
    Element {
        array: String,
        element_id: String,
        field: String,
    },
}

impl FieldPath {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn element(
        array: impl Into<String>,
        element_id: impl ToString,
        field: impl Into<String>,
    ) -> Self {
        Self::Element {
            array: array.into(),
            element_id: element_id.to_string(),
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PullMatcher {
    /// Remove elements equal to the value.
    Value(Value),
    /// Remove object elements whose `id` equals the given id.
    Id(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set { path: FieldPath, value: Value },
    Push { path: FieldPath, value: Value },
    Pull { path: FieldPath, matcher: PullMatcher },
    AddToSet { path: FieldPath, value: Value },
}

impl UpdateOp {
    pub fn path(&self) -> &FieldPath {
        match self {
            UpdateOp::Set { path, .. }
            | UpdateOp::Push { path, .. }
            | UpdateOp::Pull { path, .. }
            | UpdateOp::AddToSet { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateOutcome {
    pub const UNMATCHED: UpdateOutcome = UpdateOutcome {
        matched: 0,
        modified: 0,
    };
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: Collection, document: Document)
    -> Result<(), StoreError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection) -> Result<u64, StoreError>;

    /// Applies every operator to one document atomically. A path that does not
    /// resolve leaves the document untouched and reports it as unmatched.
    async fn update_one(
        &self,
        collection: Collection,
        id: &str,
        ops: &[UpdateOp],
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<u64, StoreError>;

    async fn delete_all(&self, collection: Collection) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value).map_err(|err| StoreError::Serialization(err.to_string()))? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|err| StoreError::Serialization(err.to_string()))
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|err| StoreError::Serialization(err.to_string()))
}

pub fn document_id(document: &Document) -> Result<&str, StoreError> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::invalid_document("document has no string `id`"))
}
