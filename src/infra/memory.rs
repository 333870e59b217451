//! In-process document store used when no Postgres URL is configured and by tests.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;

use crate::{
    application::store::{
        Collection, Document, DocumentStore, FindOptions, Projection, SortOrder, StoreError,
        UpdateOp, UpdateOutcome, apply_update, document_id, project,
    },
    cache::lock::{read_guard, write_guard},
};

const OWNER: &str = "infra::memory";

/// Documents are kept per collection in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position(documents: &[Document], id: &str) -> Option<usize> {
    documents
        .iter()
        .position(|document| document_id(document).is_ok_and(|candidate| candidate == id))
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<(), StoreError> {
        let id = document_id(&document)?.to_string();
        let mut collections = write_guard(&self.collections, OWNER, "insert_one");
        let documents = collections.entry(collection).or_default();
        if position(documents, &id).is_some() {
            return Err(StoreError::Duplicate { id });
        }
        documents.push(document);
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, StoreError> {
        let collections = read_guard(&self.collections, OWNER, "find_by_id");
        let Some(documents) = collections.get(&collection) else {
            return Ok(None);
        };
        Ok(position(documents, id).map(|index| {
            let document = documents[index].clone();
            match projection {
                Some(projection) => project(document, projection),
                None => document,
            }
        }))
    }

    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = read_guard(&self.collections, OWNER, "find");
        let Some(documents) = collections.get(&collection) else {
            return Ok(Vec::new());
        };
        let limit = options.limit.map_or(usize::MAX, to_usize);
        let skip = to_usize(options.skip);
        let found = match options.order {
            SortOrder::Natural => documents.iter().skip(skip).take(limit).cloned().collect(),
            SortOrder::ReverseNatural => documents
                .iter()
                .rev()
                .skip(skip)
                .take(limit)
                .cloned()
                .collect(),
        };
        Ok(found)
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let collections = read_guard(&self.collections, OWNER, "count");
        let len = collections.get(&collection).map_or(0, Vec::len);
        Ok(len as u64)
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: &str,
        ops: &[UpdateOp],
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = write_guard(&self.collections, OWNER, "update_one");
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(UpdateOutcome::UNMATCHED);
        };
        match position(documents, id) {
            Some(index) => apply_update(&mut documents[index], ops),
            None => Ok(UpdateOutcome::UNMATCHED),
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<u64, StoreError> {
        let mut collections = write_guard(&self.collections, OWNER, "delete_by_id");
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        match position(documents, id) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64, StoreError> {
        let mut collections = write_guard(&self.collections, OWNER, "delete_all");
        let removed = collections.remove(&collection).map_or(0, |docs| docs.len());
        Ok(removed as u64)
    }
}
