use axum::http::{HeaderMap, Method};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::access::{authorize, TableRegistry};
use crate::auth::credentials::{IDENTITY_TABLE, PASSWORD_FIELD};
use crate::database::{DataStore, Row};
use crate::error::ApiError;
use crate::filter::Translator;
use crate::middleware::Authenticator;
use crate::types::Operation;

pub const TABLE_PARAM: &str = "table";

/// Runs one proxy request: authenticate, check the table, authorize the branch,
/// translate, execute. Each step short-circuits.
pub struct Gateway {
    authenticator: Arc<dyn Authenticator>,
    registry: TableRegistry,
    translator: Translator,
    store: Arc<dyn DataStore>,
}

impl Gateway {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        registry: TableRegistry,
        translator: Translator,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self { authenticator, registry, translator, store }
    }

    pub async fn handle(
        &self,
        method: &Method,
        headers: &HeaderMap,
        params: Vec<(String, String)>,
        body: &[u8],
    ) -> Result<Vec<Row>, ApiError> {
        let operation = Operation::from_method(method)
            .ok_or_else(|| ApiError::method_not_allowed(format!("Method {} not allowed", method)))?;

        let (table, params) = split_table(params);
        let requires_branch = table.as_deref().map_or(true, |t| !self.registry.is_global(t));
        let principal = self.authenticator.authenticate(headers, requires_branch).await?;

        let table = table.ok_or_else(|| ApiError::missing_field(TABLE_PARAM))?;
        if !self.registry.is_table_allowed(&table) {
            warn!("User '{}' requested table '{}' outside the allow-list", principal.identity.nome, table);
            return Err(ApiError::forbidden("Table not allowed"));
        }

        let access = principal.identity.scope();
        if !authorize(&access, &principal.branch).is_allowed() {
            warn!(
                "User '{}' with scope '{}' denied access to branch '{}'",
                principal.identity.nome,
                access.as_str(),
                principal.branch
            );
            return Err(ApiError::forbidden("Access denied to this branch"));
        }

        let payload = parse_body(operation, body)?;
        let scope = self.registry.scope_table(&table, &principal.branch);
        let table_operation = self.translator.translate(operation, &table, &params, payload, scope)?;
        debug!("{:?} on '{}' for '{}' ({})", operation, table, principal.identity.nome, principal.branch);

        let mut rows = self.store.execute(&table_operation).await?;
        if table == IDENTITY_TABLE {
            for row in rows.iter_mut() {
                row.remove(PASSWORD_FIELD);
            }
        }
        Ok(rows)
    }
}

/// Separates the first `table` parameter from the grammar parameters.
fn split_table(params: Vec<(String, String)>) -> (Option<String>, Vec<(String, String)>) {
    let mut table = None;
    let mut rest = Vec::with_capacity(params.len());
    for (key, value) in params {
        if key == TABLE_PARAM {
            if table.is_none() && !value.is_empty() {
                table = Some(value);
            }
        } else {
            rest.push((key, value));
        }
    }
    (table, rest)
}

/// Reads and deletes carry no payload; inserts and updates need a JSON body.
fn parse_body(operation: Operation, body: &[u8]) -> Result<Option<Value>, ApiError> {
    match operation {
        Operation::Select | Operation::Delete => Ok(None),
        Operation::Create | Operation::Update => {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            serde_json::from_slice(body)
                .map(Some)
                .map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))
        }
    }
}
