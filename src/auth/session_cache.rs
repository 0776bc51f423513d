use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::credentials::{Identity, IdentityLookup};
use super::token::Claims;
use crate::access::authorize;
use crate::clock::Clock;
use crate::config::MAX_SESSION_SECS;
use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("User '{user}' may not access branch '{branch}'")]
    Forbidden { user: String, branch: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Process-local record of recently validated sessions.
///
/// Entries only save an identity lookup; authorization is recomputed from the
/// cached identity on every hit, and a missing entry is rebuilt from storage.
pub struct SessionCache {
    entries: RwLock<HashMap<String, SessionEntry>>,
    identities: Arc<dyn IdentityLookup>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
}

impl SessionCache {
    pub fn new(identities: Arc<dyn IdentityLookup>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            identities,
            clock,
            window: chrono::Duration::seconds(window.as_secs().min(MAX_SESSION_SECS) as i64),
        }
    }

    pub fn key(user_id: &str, branch: &str) -> String {
        format!("{}_{}", user_id, branch)
    }

    /// Identity for a verified token, from cache while live, else from storage.
    pub async fn lookup_or_refresh(&self, claims: &Claims) -> Result<Identity, SessionError> {
        let key = Self::key(&claims.user_id, &claims.filial);
        let now = self.clock.now();

        let cached = {
            let entries = self.entries.read().await;
            entries
                .get(&key)
                // Keys are not unique across user/branch splits: "a_b" + "c" == "a" + "b_c"
                .filter(|entry| entry.expires_at > now && entry.identity.nome == claims.user_id)
                .map(|entry| entry.identity.clone())
        };
        if let Some(identity) = cached {
            Self::check_branch(&identity, &claims.filial)?;
            return Ok(identity);
        }

        debug!("Session cache miss for {}", key);
        let identity = self
            .identities
            .find_identity(&claims.user_id)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(claims.user_id.clone()))?;
        Self::check_branch(&identity, &claims.filial)?;

        self.insert(key, identity.clone(), now).await;
        Ok(identity)
    }

    /// Seeds an entry for an identity that was just authenticated.
    pub async fn remember(&self, identity: &Identity, branch: &str) {
        let key = Self::key(&identity.nome, branch);
        self.insert(key, identity.clone(), self.clock.now()).await;
    }

    /// Drops every entry whose window has passed. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn insert(&self, key: String, identity: Identity, now: DateTime<Utc>) {
        let entry = SessionEntry { identity, expires_at: now + self.window };
        self.entries.write().await.insert(key, entry);
    }

    fn check_branch(identity: &Identity, branch: &str) -> Result<(), SessionError> {
        if authorize(&identity.scope(), branch).is_allowed() {
            Ok(())
        } else {
            Err(SessionError::Forbidden { user: identity.nome.clone(), branch: branch.to_string() })
        }
    }
}
