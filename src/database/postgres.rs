use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use super::store::{DataStore, Row, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::{SqlBuilder, TableOperation};

/// Postgres-backed store. Every statement yields one JSON array of rows.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    debug_logging: bool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, debug_logging: false }
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Opens the connection pool described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool ({} max connections)", config.max_connections);
        Ok(Self::new(pool))
    }

    fn into_rows(value: Value) -> Result<Vec<Row>, StoreError> {
        match value {
            Value::Null => Ok(vec![]),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(StoreError::Unavailable(format!("unexpected row shape: {}", other))),
                })
                .collect(),
            other => Err(StoreError::Unavailable(format!("unexpected result shape: {}", other))),
        }
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn execute(&self, operation: &TableOperation) -> Result<Vec<Row>, StoreError> {
        let sql = SqlBuilder::build(operation).map_err(|e| StoreError::Rejected(e.to_string()))?;
        if self.debug_logging {
            debug!("SQL: {} | params: {:?}", sql.query, sql.params);
        }

        let mut query = sqlx::query_scalar::<_, Value>(&sql.query);
        for param in sql.params {
            query = query.bind(Json(param));
        }
        let value = query.fetch_one(&self.pool).await?;
        Self::into_rows(value)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_array_becomes_rows() {
        let rows = PgStore::into_rows(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], json!(2));
        assert!(PgStore::into_rows(Value::Null).unwrap().is_empty());
        assert!(PgStore::into_rows(json!([1])).is_err());
        assert!(PgStore::into_rows(json!({ "id": 1 })).is_err());
    }
}
