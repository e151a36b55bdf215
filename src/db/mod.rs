pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::EtlResult;

/// Collection names shared by writers and readers
pub mod collections {
    pub const FILMS: &str = "films";
    pub const CITIES: &str = "cities";
    pub const PLACES: &str = "places";
    pub const CORRELATIONS: &str = "correlations";
    pub const LOCATION_STATS: &str = "location_stats";
    pub const REPORTS: &str = "reports";
    pub const JOBS: &str = "etl_jobs";
}

/// Document persistence seam
///
/// Everything the ETL core stores goes through this trait as JSON
/// documents upserted by business key. Upsert-by-key is atomic; concurrent
/// writers resolve last-write-wins and the core adds no locking on top.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates tables/indexes when they do not exist yet
    async fn ensure_schema(&self) -> EtlResult<()>;

    /// Inserts or fully replaces the document stored under the key
    async fn upsert(&self, collection: &str, key: &str, document: Value) -> EtlResult<()>;

    async fn get(&self, collection: &str, key: &str) -> EtlResult<Option<Value>>;

    /// Returns documents in first-write order
    async fn find(&self, collection: &str, limit: Option<usize>) -> EtlResult<Vec<Value>>;

    async fn count(&self, collection: &str) -> EtlResult<u64>;

    /// Counts documents whose top-level string field equals the value
    async fn count_where(&self, collection: &str, field: &str, value: &str) -> EtlResult<u64>;

    /// Removes documents first written before the cutoff; returns how many
    async fn delete_older_than(&self, collection: &str, cutoff: DateTime<Utc>) -> EtlResult<u64>;
}
