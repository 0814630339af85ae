//! # Durable Store
//!
//! The system of record for touristic resources. The fallback engine's only
//! dependency: point lookup, filtered listing, counting and grouped counts.
//!
//! [`StoreQuery::matches`] is the reference predicate; every backend must
//! select exactly the records it accepts.

pub mod memory;
pub mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;

pub use memory::InMemoryStore;
pub use model::{GeoBounds, GeoPoint, Resource};
pub use query::{GeoRadius, GroupField, StoreQuery};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid stored record {id}: {reason}")]
    InvalidRecord { id: i64, reason: String },
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::QueryFailed(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Grouped count: `(group key, record count)`
pub type GroupCount = (String, u64);

#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn fetch(&self, id: i64) -> StoreResult<Option<Resource>>;

    /// Every record accepted by `query`, ordered by `id`, after `offset`/`limit`
    async fn find(&self, query: &StoreQuery) -> StoreResult<Vec<Resource>>;

    /// Number of accepted records, ignoring `offset`/`limit`
    async fn count(&self, query: &StoreQuery) -> StoreResult<u64>;

    /// Accepted records grouped by `field`, ordered by count desc then key asc.
    ///
    /// A record with several types counts once under each of them.
    async fn count_by(&self, query: &StoreQuery, field: GroupField)
        -> StoreResult<Vec<GroupCount>>;

    async fn ping(&self) -> StoreResult<()>;
}
