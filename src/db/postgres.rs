use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::Store;
use crate::error::EtlResult;

/// Creates a PostgreSQL connection pool
///
/// One pool is shared by the schema setup at startup and every job
/// handler; batch writes issue one statement per document, so a small
/// connection limit covers the whole pipeline.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Postgres-backed document store
///
/// All collections share one JSONB table keyed by (collection, doc_key),
/// so upserts stay a single `ON CONFLICT` statement and new collections
/// need no schema change.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ensure_schema(&self) -> EtlResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS etl_documents (
                collection TEXT NOT NULL,
                doc_key TEXT NOT NULL,
                document JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, doc_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_etl_documents_created
            ON etl_documents (collection, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, collection: &str, key: &str, document: Value) -> EtlResult<()> {
        sqlx::query(
            r#"
            INSERT INTO etl_documents (collection, doc_key, document)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, doc_key)
            DO UPDATE SET document = EXCLUDED.document, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> EtlResult<Option<Value>> {
        let document = sqlx::query_scalar::<_, Value>(
            "SELECT document FROM etl_documents WHERE collection = $1 AND doc_key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    async fn find(&self, collection: &str, limit: Option<usize>) -> EtlResult<Vec<Value>> {
        // LIMIT NULL means no limit in Postgres
        let documents = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT document FROM etl_documents
            WHERE collection = $1
            ORDER BY created_at, doc_key
            LIMIT $2
            "#,
        )
        .bind(collection)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    async fn count(&self, collection: &str) -> EtlResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM etl_documents WHERE collection = $1")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn count_where(&self, collection: &str, field: &str, value: &str) -> EtlResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM etl_documents
            WHERE collection = $1 AND document ->> $2 = $3
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn delete_older_than(&self, collection: &str, cutoff: DateTime<Utc>) -> EtlResult<u64> {
        let result =
            sqlx::query("DELETE FROM etl_documents WHERE collection = $1 AND created_at < $2")
                .bind(collection)
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
