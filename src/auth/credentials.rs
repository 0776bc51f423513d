use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::password::{hash_password, verify_password, PasswordError};
use crate::access::AccessScope;
use crate::database::{DataStore, Row, StoreError};
use crate::filter::{Clause, QueryOperation, TableOperation};

pub const IDENTITY_TABLE: &str = "acessos";
pub const NAME_FIELD: &str = "nome";
pub const SCOPE_FIELD: &str = "tipo_acesso";
pub const PASSWORD_FIELD: &str = "senha";

/// A user as stored in `acessos`, without its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub nome: String,
    pub tipo_acesso: String,
}

impl Identity {
    pub fn scope(&self) -> AccessScope {
        AccessScope::parse(&self.tipo_acesso)
    }
}

/// Finds identities by unique name.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn find_identity(&self, name: &str) -> Result<Option<Identity>, StoreError>;
}

/// Reads `acessos` through the data store.
pub struct IdentityRepository {
    store: Arc<dyn DataStore>,
}

impl IdentityRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Exactly one row named `name`; none or several rows mean no match.
    async fn find_row(&self, name: &str, columns: &[&str]) -> Result<Option<Row>, StoreError> {
        let query = QueryOperation::new(IDENTITY_TABLE)
            .with(Clause::equals(NAME_FIELD, name))
            .with(Clause::Select(columns.iter().map(|c| c.to_string()).collect()))
            .with(Clause::Limit(2));

        let mut rows = self.store.execute(&TableOperation::Select(query)).await?;
        if rows.len() != 1 {
            return Ok(None);
        }
        Ok(rows.pop())
    }

    fn to_identity(row: &Row) -> Option<Identity> {
        Some(Identity {
            nome: row.get(NAME_FIELD)?.as_str()?.to_string(),
            tipo_acesso: row.get(SCOPE_FIELD)?.as_str()?.to_string(),
        })
    }
}

#[async_trait]
impl IdentityLookup for IdentityRepository {
    async fn find_identity(&self, name: &str) -> Result<Option<Identity>, StoreError> {
        let row = self.find_row(name, &[NAME_FIELD, SCOPE_FIELD]).await?;
        Ok(row.as_ref().and_then(Self::to_identity))
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

// Verified when the user is unknown so both failure paths cost one Argon2 run.
static DECOY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("decoy").ok());

/// Checks a username/password pair against the stored Argon2 hash.
pub struct CredentialVerifier {
    repository: IdentityRepository,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { repository: IdentityRepository::new(store) }
    }

    /// `None` for an unknown user and for a wrong password alike.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Option<Identity>, CredentialError> {
        let row = self
            .repository
            .find_row(username, &[NAME_FIELD, SCOPE_FIELD, PASSWORD_FIELD])
            .await?;

        let Some(row) = row else {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                verify_password(decoy, password).await?;
            }
            return Ok(None);
        };

        let stored = row.get(PASSWORD_FIELD).and_then(Value::as_str).unwrap_or_default();
        if !verify_password(stored, password).await? {
            return Ok(None);
        }
        Ok(IdentityRepository::to_identity(&row))
    }
}
