pub mod protected;
pub mod public;

use axum::http::Method;

use crate::error::ApiError;

/// JSON 405 for methods a route does not serve.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(format!("Method {} not allowed", method))
}
