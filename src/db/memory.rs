use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::db::Store;
use crate::error::EtlResult;

struct StoredDoc {
    key: String,
    document: Value,
    created_at: DateTime<Utc>,
}

/// In-process document store
///
/// Keeps each collection as an insertion-ordered vector so `find` returns
/// first-write order exactly like the Postgres implementation. Used by
/// tests and dry runs; not meant for large datasets.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> EtlResult<()> {
        Ok(())
    }

    async fn upsert(&self, collection: &str, key: &str, document: Value) -> EtlResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        match docs.iter_mut().find(|d| d.key == key) {
            Some(existing) => {
                // Replacement keeps the original position and created_at
                existing.document = document;
            }
            None => docs.push(StoredDoc {
                key: key.to_string(),
                document,
                created_at: Utc::now(),
            }),
        }

        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> EtlResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.key == key))
            .map(|d| d.document.clone()))
    }

    async fn find(&self, collection: &str, limit: Option<usize>) -> EtlResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|d| d.document.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn count(&self, collection: &str) -> EtlResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|d| d.len()).unwrap_or(0) as u64)
    }

    async fn count_where(&self, collection: &str, field: &str, value: &str) -> EtlResult<u64> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.document.get(field).and_then(|v| v.as_str()) == Some(value))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn delete_older_than(&self, collection: &str, cutoff: DateTime<Utc>) -> EtlResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| d.created_at >= cutoff);
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_key() {
        let store = MemoryStore::new();
        store
            .upsert("films", "1", json!({"title": "Inception"}))
            .await
            .unwrap();
        store
            .upsert("films", "1", json!({"title": "Inception", "popularity": 83.5}))
            .await
            .unwrap();

        assert_eq!(store.count("films").await.unwrap(), 1);
        let doc = store.get("films", "1").await.unwrap().unwrap();
        assert_eq!(doc["popularity"], 83.5);
    }

    #[tokio::test]
    async fn test_find_preserves_first_write_order() {
        let store = MemoryStore::new();
        store.upsert("places", "b", json!({"n": 1})).await.unwrap();
        store.upsert("places", "a", json!({"n": 2})).await.unwrap();
        store.upsert("places", "b", json!({"n": 3})).await.unwrap();

        let docs = store.find("places", None).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["n"], 3);
        assert_eq!(docs[1]["n"], 2);

        let limited = store.find("places", Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_count_where_matches_string_fields() {
        let store = MemoryStore::new();
        store
            .upsert("etl_jobs", "j1", json!({"status": "completed"}))
            .await
            .unwrap();
        store
            .upsert("etl_jobs", "j2", json!({"status": "failed"}))
            .await
            .unwrap();
        store
            .upsert("etl_jobs", "j3", json!({"status": "completed"}))
            .await
            .unwrap();

        assert_eq!(
            store.count_where("etl_jobs", "status", "completed").await.unwrap(),
            2
        );
        assert_eq!(
            store.count_where("etl_jobs", "status", "queued").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let store = MemoryStore::new();
        store.upsert("etl_jobs", "old", json!({})).await.unwrap();

        let future_cutoff = Utc::now() + chrono::Duration::seconds(5);
        let deleted = store.delete_older_than("etl_jobs", future_cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count("etl_jobs").await.unwrap(), 0);

        store.upsert("etl_jobs", "fresh", json!({})).await.unwrap();
        let past_cutoff = Utc::now() - chrono::Duration::seconds(5);
        let deleted = store.delete_older_than("etl_jobs", past_cutoff).await.unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.count("etl_jobs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get("films", "1").await.unwrap().is_none());
        assert!(store.find("films", None).await.unwrap().is_empty());
        assert_eq!(store.count("films").await.unwrap(), 0);
        assert_eq!(store.delete_older_than("films", Utc::now()).await.unwrap(), 0);
    }
}
