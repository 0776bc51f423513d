// /api/secure-proxy - gated CRUD authenticated by session token

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, RawQuery, State},
    http::{HeaderMap, Method},
    response::Json,
};
use serde_json::{json, Value};

use super::query_pairs;
use crate::app::AppState;
use crate::database::Row;
use crate::error::ApiError;
use crate::handlers::public::auth::{issue_session, json_rejection, LoginRequest};

/// ANY /api/secure-proxy
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<Vec<Row>>, ApiError> {
    let rows = state
        .secure_proxy
        .handle(&method, &headers, query_pairs(query.as_deref()), &body)
        .await?;
    Ok(Json(rows))
}

/**
 * POST /api/secure-proxy/authenticate - issue a token and warm the session cache
 *
 * Same input and checks as login. The new session is cached immediately so the
 * first proxied call does not hit identity storage.
 */
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    let session = issue_session(&state, &request).await?;
    state.sessions.remember(&session.identity, &session.claims.filial).await;

    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "user": session.identity,
        "expiresIn": state.session_ttl.as_millis() as u64
    })))
}
