use async_trait::async_trait;
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::warn;

use crate::access::ALL_BRANCHES;
use crate::auth::{CredentialVerifier, Identity, SessionCache, TokenCodec};
use crate::error::ApiError;

pub const USER_HEADER: &str = "user";
pub const PASSWORD_HEADER: &str = "password";
pub const BRANCH_HEADER: &str = "filial";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Authenticated caller and the branch every operation is scoped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub identity: Identity,
    pub branch: String,
}

/// Establishes who is calling a proxy endpoint.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `requires_branch` is false when the target table is global.
    async fn authenticate(&self, headers: &HeaderMap, requires_branch: bool) -> Result<Principal, ApiError>;
}

/// `user` / `password` / `filial` request headers, checked on every call.
pub struct HeaderCredentials {
    verifier: Arc<CredentialVerifier>,
}

impl HeaderCredentials {
    pub fn new(verifier: Arc<CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Authenticator for HeaderCredentials {
    async fn authenticate(&self, headers: &HeaderMap, requires_branch: bool) -> Result<Principal, ApiError> {
        let (Some(user), Some(password)) = (header(headers, USER_HEADER), header(headers, PASSWORD_HEADER)) else {
            return Err(ApiError::unauthorized("User and password credentials are required"));
        };
        let branch = header(headers, BRANCH_HEADER);
        if requires_branch && branch.is_none() {
            return Err(ApiError::unauthorized("Branch credentials are required"));
        }

        let identity = self.verifier.verify(user, password).await?.ok_or_else(|| {
            warn!("Rejected proxy credentials for '{}'", user);
            ApiError::unauthorized("Invalid credentials")
        })?;

        Ok(Principal {
            identity,
            branch: branch.unwrap_or(ALL_BRANCHES).to_string(),
        })
    }
}

/// Session token from `x-session-token` or `Authorization: Bearer`.
///
/// The branch comes from the verified token only; the session cache
/// re-authorizes it against the stored identity.
pub struct SessionToken {
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionCache>,
}

impl SessionToken {
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<SessionCache>) -> Self {
        Self { codec, sessions }
    }
}

#[async_trait]
impl Authenticator for SessionToken {
    async fn authenticate(&self, headers: &HeaderMap, _requires_branch: bool) -> Result<Principal, ApiError> {
        let token = extract_session_token(headers).map_err(ApiError::unauthorized)?;
        let claims = self.codec.verify(&token)?;
        let identity = self.sessions.lookup_or_refresh(&claims).await?;

        let swept = self.sessions.sweep().await;
        if swept > 0 {
            tracing::debug!("Swept {} expired sessions", swept);
        }

        Ok(Principal { identity, branch: claims.filial })
    }
}

/// Extract the session token, preferring the dedicated header
pub fn extract_session_token(headers: &HeaderMap) -> Result<String, String> {
    if let Some(token) = header(headers, SESSION_TOKEN_HEADER) {
        return Ok(token.to_string());
    }

    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Session token is required".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty session token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Non-empty header value as text.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    use crate::auth::IdentityRepository;
    use crate::testing::{fixture_store, identity, ManualClock, FIXTURE_PASSWORD};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn header_credentials() -> HeaderCredentials {
        HeaderCredentials::new(Arc::new(CredentialVerifier::new(Arc::new(fixture_store()))))
    }

    #[tokio::test]
    async fn header_credentials_need_user_and_password() {
        let auth = header_credentials();
        let err = auth.authenticate(&headers(&[("user", "ana")]), false).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn branch_header_only_required_for_scoped_tables() {
        let auth = header_credentials();
        let creds = headers(&[("user", "root"), ("password", FIXTURE_PASSWORD)]);

        let err = auth.authenticate(&creds, true).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        let principal = auth.authenticate(&creds, false).await.unwrap();
        assert_eq!(principal.branch, "ALL");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let auth = header_credentials();
        let creds = headers(&[("user", "ana"), ("password", "nope"), ("filial", "SP01")]);
        let err = auth.authenticate(&creds, true).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Invalid credentials");
    }

    #[test]
    fn session_token_from_either_header() {
        assert_eq!(
            extract_session_token(&headers(&[("x-session-token", "abc")])),
            Ok("abc".to_string())
        );
        assert_eq!(
            extract_session_token(&headers(&[("authorization", "Bearer xyz")])),
            Ok("xyz".to_string())
        );
        assert!(extract_session_token(&headers(&[("authorization", "Basic xyz")])).is_err());
        assert!(extract_session_token(&HeaderMap::new()).is_err());
    }

    #[tokio::test]
    async fn session_token_uses_branch_from_token() {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default());
        let codec = Arc::new(TokenCodec::new("secret", clock.clone()).unwrap());
        let lookup = Arc::new(IdentityRepository::new(Arc::new(fixture_store())));
        let sessions = Arc::new(SessionCache::new(lookup, clock.clone(), Duration::from_secs(3600)));
        let auth = SessionToken::new(codec.clone(), sessions);

        let (token, _) = codec
            .issue(&identity("ana", "SP01"), Some("SP01"), Duration::from_secs(60))
            .unwrap();
        let principal = auth
            .authenticate(&headers(&[("x-session-token", token.as_str()), ("filial", "RJ02")]), true)
            .await
            .unwrap();
        assert_eq!(principal.branch, "SP01");
        assert_eq!(principal.identity.tipo_acesso, "SP01");

        clock.advance_secs(60);
        let err = auth
            .authenticate(&headers(&[("x-session-token", token.as_str())]), true)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}
