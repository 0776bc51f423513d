// ANY /api/proxy - gated CRUD authenticated by `user` / `password` / `filial` headers

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method},
    response::Json,
};

use super::query_pairs;
use crate::app::AppState;
use crate::database::Row;
use crate::error::ApiError;

pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<Vec<Row>>, ApiError> {
    let rows = state
        .proxy
        .handle(&method, &headers, query_pairs(query.as_deref()), &body)
        .await?;
    Ok(Json(rows))
}
