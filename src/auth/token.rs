use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::credentials::Identity;
use crate::access::ALL_BRANCHES;
use crate::clock::Clock;
use crate::config::MAX_SESSION_SECS;

/// Signed session claims. Field names follow the token wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub filial: String,
    #[serde(rename = "tipoAcesso")]
    pub tipo_acesso: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Token generation failed: {0}")]
    Generation(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired")]
    Expired,
}

/// HS256 session token codec. Expiry is checked against the injected clock
/// on every verification, with no leeway.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    /// Token for `identity` on `branch` (`ALL` when none was requested).
    pub fn issue(&self, identity: &Identity, branch: Option<&str>, ttl: Duration) -> Result<(String, Claims), TokenError> {
        let iat = self.clock.now().timestamp();
        let claims = Claims {
            user_id: identity.nome.clone(),
            filial: branch.unwrap_or(ALL_BRANCHES).to_string(),
            tipo_acesso: identity.tipo_acesso.clone(),
            iat,
            exp: iat + ttl.as_secs().min(MAX_SESSION_SECS) as i64,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{identity, ManualClock};

    const HOUR: Duration = Duration::from_secs(3600);

    fn codec(clock: Arc<ManualClock>) -> TokenCodec {
        TokenCodec::new("test-secret", clock).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock.clone());
        let (token, issued) = codec.issue(&identity("ana", "SP01"), Some("SP01"), HOUR).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims, issued);
        assert_eq!(claims.user_id, "ana");
        assert_eq!(claims.filial, "SP01");
        assert_eq!(claims.tipo_acesso, "SP01");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let codec = codec(Arc::new(ManualClock::default()));
        let (_, claims) = codec.issue(&identity("ana", "SP01"), Some("SP01"), Duration::MAX).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_SESSION_SECS as i64);
    }

    #[test]
    fn missing_branch_means_all() {
        let codec = codec(Arc::new(ManualClock::default()));
        let (_, claims) = codec.issue(&identity("root", "ALL"), None, HOUR).unwrap();
        assert_eq!(claims.filial, "ALL");
    }

    #[test]
    fn expiry_is_a_hard_boundary() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock.clone());
        let (token, _) = codec.issue(&identity("ana", "SP01"), Some("SP01"), HOUR).unwrap();

        clock.advance_secs(3599);
        assert!(codec.verify(&token).is_ok());
        clock.advance_secs(1);
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
        clock.advance_secs(86_400);
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_or_tampered_tokens_fail() {
        let clock = Arc::new(ManualClock::default());
        let ours = codec(clock.clone());
        let theirs = TokenCodec::new("other-secret", clock).unwrap();
        let (token, _) = theirs.issue(&identity("ana", "ALL"), Some("SP01"), HOUR).unwrap();

        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid(_))));
        assert!(matches!(ours.verify("not.a.token"), Err(TokenError::Invalid(_))));
        assert!(matches!(ours.verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            TokenCodec::new("", Arc::new(ManualClock::default())),
            Err(TokenError::MissingSecret)
        ));
    }
}
