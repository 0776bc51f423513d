use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::filter::TableOperation;

pub type Row = Map<String, Value>;

/// Errors from a data store call
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the statement; the message is safe to return to callers.
    #[error("{0}")]
    Rejected(String),

    #[error("Data store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Data store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => StoreError::Rejected(db.message().to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Relational data store reached by the gateway.
///
/// Every operation returns the affected rows: matching rows for a select,
/// inserted, updated or removed rows for mutations.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn execute(&self, operation: &TableOperation) -> Result<Vec<Row>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Bounds every call of the wrapped store.
pub struct TimeoutStore {
    inner: Arc<dyn DataStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn DataStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl DataStore for TimeoutStore {
    async fn execute(&self, operation: &TableOperation) -> Result<Vec<Row>, StoreError> {
        tokio::time::timeout(self.limit, self.inner.execute(operation))
            .await
            .map_err(|_| {
                tracing::error!("Data store call on '{}' timed out after {:?}", operation.table(), self.limit);
                StoreError::Timeout(self.limit)
            })?
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        tokio::time::timeout(self.limit, self.inner.health_check())
            .await
            .map_err(|_| StoreError::Timeout(self.limit))?
    }
}
