//! Postgres-backed document store: one JSONB row per document.

mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query, query_scalar,
    types::Json,
};
use tracing::{debug, info};

use crate::application::store::{
    Collection, Document, DocumentStore, FindOptions, Projection, SortOrder, StoreError, UpdateOp,
    UpdateOutcome, apply_update, document_id, project,
};

use util::{to_i64, to_u64};

const FIND_NATURAL: &str = "SELECT body FROM documents WHERE collection = $1 \
    ORDER BY seq ASC OFFSET $2 LIMIT $3";
const FIND_REVERSE: &str = "SELECT body FROM documents WHERE collection = $1 \
    ORDER BY seq DESC OFFSET $2 LIMIT $3";

#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<(), StoreError> {
        let id = document_id(&document)?.to_string();
        let inserted = query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection.as_str())
        .bind(&id)
        .bind(Json(&document))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Duplicate { id });
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, StoreError> {
        let body = query_scalar::<_, Json<Document>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(body.map(|Json(document)| match projection {
            Some(projection) => project(document, projection),
            None => document,
        }))
    }

    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = match options.order {
            SortOrder::Natural => FIND_NATURAL,
            SortOrder::ReverseNatural => FIND_REVERSE,
        };
        let limit = options
            .limit
            .map(|limit| to_i64(limit, "limit"))
            .transpose()?;

        let rows = query_scalar::<_, Json<Document>>(sql)
            .bind(collection.as_str())
            .bind(to_i64(options.skip, "skip")?)
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
            .bind(collection.as_str())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        to_u64(count)
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: &str,
        ops: &[UpdateOp],
    ) -> Result<UpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let current = query_scalar::<_, Json<Document>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(Json(mut document)) = current else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(UpdateOutcome::UNMATCHED);
        };

        let outcome = apply_update(&mut document, ops)?;
        if outcome.modified > 0 {
            query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .bind(Json(&document))
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            collection = collection.as_str(),
            id,
            matched = outcome.matched,
            modified = outcome.modified,
            "document updated"
        );
        Ok(outcome)
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<u64, StoreError> {
        query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(self.pool())
            .await
            .map(|result| result.rows_affected())
            .map_err(map_sqlx_error)
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64, StoreError> {
        query("DELETE FROM documents WHERE collection = $1")
            .bind(collection.as_str())
            .execute(self.pool())
            .await
            .map(|result| result.rows_affected())
            .map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("document store pool closed");
    }
}
