// handlers/public/auth.rs - login, token validation and logout
//
// The routes accept either the dedicated paths or the single `/api/auth`
// endpoint with an `action` field in the body.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::access::{authorize, ALL_BRANCHES};
use crate::app::AppState;
use crate::auth::{Claims, Identity};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub user: Option<String>,
    pub password: Option<String>,
    pub filial: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    pub token: Option<String>,
}

/// A freshly issued session token.
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
    pub identity: Identity,
}

/**
 * POST /api/auth/login - exchange credentials for a session token
 *
 * Input: `{ "user": "...", "password": "...", "filial": "SP01" }`
 * (`filial` may be omitted; the token is then issued for `ALL`).
 *
 * Output: `{ success, token, user: { nome, tipo_acesso }, expiresIn }`
 * with `expiresIn` in milliseconds.
 */
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    login_with(&state, request).await
}

/// POST /api/auth/validate - `{ token }` -> `{ valid, user, filial, exp }`
pub async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    validate_with(&state, request).await
}

/// POST /api/auth/logout - stateless; nothing is revoked server-side.
pub async fn logout() -> Json<Value> {
    logout_response()
}

/// POST /api/auth - `{ action: "login" | "validate" | "logout", ... }`
pub async fn action(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(json_rejection)?;
    let action = body.get("action").and_then(Value::as_str).unwrap_or_default().to_string();

    match action.as_str() {
        "login" => {
            let request = serde_json::from_value(body).map_err(|e| ApiError::invalid_json(e.to_string()))?;
            Ok(login_with(&state, request).await?.into_response())
        }
        "validate" => {
            let request = serde_json::from_value(body).map_err(|e| ApiError::invalid_json(e.to_string()))?;
            validate_with(&state, request).await
        }
        "logout" => Ok(logout_response().into_response()),
        _ => Err(ApiError::bad_request("Unrecognized action")),
    }
}

async fn login_with(state: &AppState, request: LoginRequest) -> Result<Json<Value>, ApiError> {
    let session = issue_session(state, &request).await?;
    info!("User '{}' logged in for branch '{}'", session.identity.nome, session.claims.filial);

    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "user": session.identity,
        "expiresIn": state.session_ttl.as_millis() as u64
    })))
}

async fn validate_with(state: &AppState, request: ValidateRequest) -> Result<Response, ApiError> {
    let token = non_empty(request.token.as_deref()).ok_or_else(|| ApiError::missing_field("token"))?;

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Token validation failed: {}", e);
            return Ok(invalid_token("Invalid token"));
        }
    };

    let Some(identity) = state.identities.find_identity(&claims.user_id).await? else {
        return Ok(invalid_token("User not found"));
    };

    Ok(Json(json!({
        "valid": true,
        "user": identity,
        "filial": claims.filial,
        "exp": claims.exp
    }))
    .into_response())
}

fn logout_response() -> Json<Value> {
    Json(json!({ "success": true, "message": "Logged out" }))
}

/// Verifies credentials, authorizes the requested branch and signs a token.
pub(crate) async fn issue_session(state: &AppState, request: &LoginRequest) -> Result<IssuedSession, ApiError> {
    let user = non_empty(request.user.as_deref()).ok_or_else(|| ApiError::missing_field("user"))?;
    let password = non_empty(request.password.as_deref()).ok_or_else(|| ApiError::missing_field("password"))?;
    let branch = non_empty(request.filial.as_deref());

    let identity = state.credentials.verify(user, password).await?.ok_or_else(|| {
        warn!("Failed login for '{}'", user);
        ApiError::unauthorized("Invalid credentials")
    })?;

    let scope = identity.scope();
    let requested = branch.unwrap_or(ALL_BRANCHES);
    if !authorize(&scope, requested).is_allowed() {
        warn!("User '{}' with scope '{}' denied access to branch '{}'", user, scope.as_str(), requested);
        return Err(ApiError::forbidden("Access denied to this branch"));
    }

    let (token, claims) = state.tokens.issue(&identity, branch, state.session_ttl)?;
    Ok(IssuedSession { token, claims, identity })
}

fn invalid_token(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message, "valid": false }))).into_response()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_json(rejection.body_text())
}
