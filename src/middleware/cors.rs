use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method, StatusCode,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use super::auth::{BRANCH_HEADER, PASSWORD_HEADER, SESSION_TOKEN_HEADER, USER_HEADER};

const PROXY_METHODS: [Method; 5] = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];

/// Configured origins, with credentials. Unparseable origins are skipped.
pub fn allow_list(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(PROXY_METHODS)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static(SESSION_TOKEN_HEADER)])
        .allow_credentials(true)
}

/// Any origin, for the header-credential proxy. Browsers refuse credentials
/// together with a wildcard origin, so the flag is not sent.
pub fn any_origin() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(PROXY_METHODS)
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(USER_HEADER),
            HeaderName::from_static(PASSWORD_HEADER),
            HeaderName::from_static(BRANCH_HEADER),
        ])
}

/// Bare `OPTIONS` requests that are not CORS preflights.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
