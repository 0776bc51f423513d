// GET /api/filiais - active branches for the login screen

use axum::{extract::State, response::Json};

use crate::app::AppState;
use crate::database::Row;
use crate::error::ApiError;
use crate::filter::{Clause, FilterOrderInfo, QueryOperation, SortDirection, TableOperation};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Row>>, ApiError> {
    let query = QueryOperation::new("filiais")
        .with(Clause::Select(vec!["nome".into(), "descricao".into(), "ativo".into()]))
        .with(Clause::equals("ativo", "true"))
        .with(Clause::Order(vec![FilterOrderInfo { column: "nome".into(), sort: SortDirection::Asc }]));

    let rows = state
        .store
        .execute(&TableOperation::Select(query))
        .await
        .map_err(|e| {
            tracing::error!("Error fetching branches: {}", e);
            ApiError::internal_server_error("Error fetching branches")
        })?;

    Ok(Json(rows))
}
