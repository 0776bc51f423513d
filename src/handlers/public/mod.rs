pub mod auth;
pub mod filiais;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// Liveness plus a data store ping.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("database unavailable"));
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{DataStore, Row, StoreError};
    use crate::filter::TableOperation;
    use crate::testing::{fixture_store, ManualClock};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct DownStore;

    #[async_trait]
    impl DataStore for DownStore {
        async fn execute(&self, _: &TableOperation) -> Result<Vec<Row>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn state(store: Arc<dyn DataStore>) -> AppState {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "health-secret".to_string();
        AppState::new(store, Arc::new(ManualClock::default()), &config).unwrap()
    }

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let Json(body) = health(State(state(Arc::new(fixture_store())))).await.unwrap();
        assert_eq!(body["data"]["database"], "ok");
    }

    #[tokio::test]
    async fn unreachable_store_is_service_unavailable() {
        let err = health(State(state(Arc::new(DownStore)))).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_json()["code"], "SERVICE_UNAVAILABLE");
        assert!(!err.message().contains("refused"));
    }
}
