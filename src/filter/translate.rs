use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::{validate_column, Filter};
use super::types::{Clause, QueryOperation, TableOperation};
use crate::types::Operation;

/// Maps an operation plus query-string pairs and body onto a `TableOperation`.
///
/// `scope` is the mandatory branch clause for branch-scoped tables. When present,
/// any caller-supplied filter on the same field is discarded so that the scope
/// clause is the only one constraining that field.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    filter: Filter,
}

impl Translator {
    pub fn new(filter: Filter) -> Self {
        Self { filter }
    }

    pub fn translate(
        &self,
        operation: Operation,
        table: &str,
        params: &[(String, String)],
        body: Option<Value>,
        scope: Option<Clause>,
    ) -> Result<TableOperation, FilterError> {
        let scope = scope.map(ScopeClause::from_clause).transpose()?;
        match operation {
            Operation::Select => {
                let mut query = self.filter.parse(table, params)?;
                if let Some(scope) = &scope {
                    scope.apply(&mut query);
                }
                Ok(TableOperation::Select(query))
            }
            Operation::Create => {
                // Parsing still validates the query string even though inserts ignore it.
                self.filter.parse(table, params)?;
                let mut rows = Self::insert_rows(body)?;
                if let Some(scope) = &scope {
                    for row in rows.iter_mut() {
                        row.insert(scope.field.clone(), Value::String(scope.value.clone()));
                    }
                }
                Ok(TableOperation::Insert { table: table.to_string(), rows })
            }
            Operation::Update => {
                let query = self.identifying_query(table, params, scope.as_ref(), "PATCH")?;
                let mut changes = Self::change_set(body)?;
                if let Some(scope) = &scope {
                    changes.remove(&scope.field);
                }
                if changes.is_empty() {
                    return Err(FilterError::InvalidPayload("no fields to update".to_string()));
                }
                Ok(TableOperation::Update { query, changes })
            }
            Operation::Delete => {
                let query = self.identifying_query(table, params, scope.as_ref(), "DELETE")?;
                Ok(TableOperation::Delete { query })
            }
        }
    }

    /// PATCH and DELETE identify rows through `eq.` filters only.
    fn identifying_query(
        &self,
        table: &str,
        params: &[(String, String)],
        scope: Option<&ScopeClause>,
        method: &'static str,
    ) -> Result<QueryOperation, FilterError> {
        let parsed = self.filter.parse(table, params)?;
        let mut query = QueryOperation::new(table);
        query.clauses = parsed
            .clauses
            .into_iter()
            .filter(|c| matches!(c, Clause::Equals { .. }))
            .filter(|c| scope.map_or(true, |s| c.filter_field() != Some(s.field.as_str())))
            .collect();
        if query.clauses.is_empty() {
            return Err(FilterError::UnfilteredMutation(method));
        }
        if let Some(scope) = scope {
            scope.apply(&mut query);
        }
        Ok(query)
    }

    fn insert_rows(body: Option<Value>) -> Result<Vec<Map<String, Value>>, FilterError> {
        let rows = match body {
            Some(Value::Object(row)) => vec![row],
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(FilterError::InvalidPayload("every inserted row must be an object".to_string())),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(FilterError::InvalidPayload("body must be an object or an array of objects".to_string())),
        };
        if rows.is_empty() {
            return Err(FilterError::InvalidPayload("nothing to insert".to_string()));
        }
        for row in &rows {
            row.keys().try_for_each(|k| validate_column(k))?;
        }
        Ok(rows)
    }

    fn change_set(body: Option<Value>) -> Result<Map<String, Value>, FilterError> {
        match body {
            Some(Value::Object(changes)) => {
                changes.keys().try_for_each(|k| validate_column(k))?;
                Ok(changes)
            }
            _ => Err(FilterError::InvalidPayload("body must be an object of fields to update".to_string())),
        }
    }
}

struct ScopeClause {
    field: String,
    value: String,
}

impl ScopeClause {
    fn from_clause(clause: Clause) -> Result<Self, FilterError> {
        match clause {
            Clause::Equals { field, value } => Ok(Self { field, value }),
            other => Err(FilterError::InvalidPayload(format!("scope must be an equality clause, got {:?}", other))),
        }
    }

    fn apply(&self, query: &mut QueryOperation) {
        query
            .clauses
            .retain(|c| c.filter_field() != Some(self.field.as_str()));
        query.clauses.push(Clause::equals(self.field.clone(), self.value.clone()));
    }
}
