//! Postgres rendering of a `TableOperation`.
//!
//! Every statement returns a single JSON array (`json_agg`) so rows of any shape
//! come back without per-column decoding. Query-string values are strings; they
//! are bound as JSON and coerced to the column's declared type through
//! `json_populate_record(NULL::"table", ...)`, which keeps `age >= 18` numeric on
//! an integer column without ever splicing a value into SQL text.

use serde_json::{json, Map, Value};

use super::error::FilterError;
use super::filter::{quote_identifier, validate_column, validate_table_name};
use super::filter_order::FilterOrder;
use super::types::{Clause, QueryOperation, SqlResult, TableOperation};

pub struct SqlBuilder {
    table: String,
    params: Vec<Value>,
}

impl SqlBuilder {
    pub fn build(operation: &TableOperation) -> Result<SqlResult, FilterError> {
        validate_table_name(operation.table())?;
        let mut builder = Self { table: operation.table().to_string(), params: vec![] };
        let statement = match operation {
            TableOperation::Select(query) => builder.select(query)?,
            TableOperation::Insert { rows, .. } => builder.insert(rows)?,
            TableOperation::Update { query, changes } => builder.update(query, changes)?,
            TableOperation::Delete { query } => builder.delete(query)?,
        };
        Ok(SqlResult { query: statement, params: builder.params })
    }

    fn select(&mut self, query: &QueryOperation) -> Result<String, FilterError> {
        let table = quote_identifier(&self.table);
        let columns = if query.projection().is_empty() {
            format!("{}.*", table)
        } else {
            query
                .projection()
                .iter()
                .map(|c| self.column(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let where_clause = self.where_clause(query)?;
        let order_clause = FilterOrder::generate(&self.table, &query.ordering());
        let limit_clause = query.limit().map(|l| format!("LIMIT {}", l)).unwrap_or_default();

        let inner = [
            format!("SELECT {}", columns),
            format!("FROM {}", table),
            where_clause,
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(format!("SELECT COALESCE(json_agg(q), '[]'::json) FROM ({}) AS q", inner))
    }

    fn insert(&mut self, rows: &[Map<String, Value>]) -> Result<String, FilterError> {
        let mut columns: Vec<&String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                validate_column(key)?;
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
        }
        if columns.is_empty() {
            return Err(FilterError::InvalidPayload("inserted rows have no fields".to_string()));
        }

        let table = quote_identifier(&self.table);
        let target = columns.iter().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(", ");
        let source = columns
            .iter()
            .map(|c| format!("v.{}", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let param = self.param(Value::Array(rows.iter().cloned().map(Value::Object).collect()));

        Ok(format!(
            "WITH q AS (INSERT INTO {t} ({target}) SELECT {source} FROM json_populate_recordset(NULL::{t}, {p}::json) AS v RETURNING *) \
             SELECT COALESCE(json_agg(q), '[]'::json) FROM q",
            t = table,
            target = target,
            source = source,
            p = param,
        ))
    }

    fn update(&mut self, query: &QueryOperation, changes: &Map<String, Value>) -> Result<String, FilterError> {
        if changes.is_empty() {
            return Err(FilterError::InvalidPayload("no fields to update".to_string()));
        }
        let table = quote_identifier(&self.table);
        let param = self.param(Value::Object(changes.clone()));
        let assignments = changes
            .keys()
            .map(|c| {
                validate_column(c)?;
                Ok(format!("{col} = patch.{col}", col = quote_identifier(c)))
            })
            .collect::<Result<Vec<_>, FilterError>>()?
            .join(", ");
        let where_clause = self.where_clause(query)?;

        Ok(format!(
            "WITH q AS (UPDATE {t} SET {assignments} FROM json_populate_record(NULL::{t}, {p}::json) AS patch {w} RETURNING {t}.*) \
             SELECT COALESCE(json_agg(q), '[]'::json) FROM q",
            t = table,
            assignments = assignments,
            p = param,
            w = where_clause,
        ))
    }

    fn delete(&mut self, query: &QueryOperation) -> Result<String, FilterError> {
        let table = quote_identifier(&self.table);
        let where_clause = self.where_clause(query)?;
        Ok(format!(
            "WITH q AS (DELETE FROM {t} {w} RETURNING *) SELECT COALESCE(json_agg(q), '[]'::json) FROM q",
            t = table,
            w = where_clause,
        ))
    }

    fn where_clause(&mut self, query: &QueryOperation) -> Result<String, FilterError> {
        let mut conditions = vec![];
        for clause in query.filters() {
            conditions.push(self.condition(clause)?);
        }
        if conditions.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("WHERE {}", conditions.join(" AND ")))
    }

    fn condition(&mut self, clause: &Clause) -> Result<String, FilterError> {
        let (field, operator, value) = match clause {
            Clause::Equals { field, value } => (field, "=", value),
            Clause::GreaterOrEqual { field, value } => (field, ">=", value),
            Clause::LessOrEqual { field, value } => (field, "<=", value),
            Clause::In { field, values } => {
                validate_column(field)?;
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let rows: Vec<Value> = values.iter().map(|v| json!({ field.as_str(): v })).collect();
                let param = self.param(Value::Array(rows));
                return Ok(format!(
                    "{col} IN (SELECT v.{f} FROM json_populate_recordset(NULL::{t}, {p}::json) AS v)",
                    col = self.column(field),
                    f = quote_identifier(field),
                    t = quote_identifier(&self.table),
                    p = param,
                ));
            }
            other => {
                return Err(FilterError::InvalidPayload(format!("{:?} is not a row filter", other)));
            }
        };
        let typed = self.typed_value(field, value)?;
        Ok(format!("{} {} {}", self.column(field), operator, typed))
    }

    /// `value` coerced to the type of `table.field`.
    fn typed_value(&mut self, field: &str, value: &str) -> Result<String, FilterError> {
        validate_column(field)?;
        let param = self.param(json!({ field: value }));
        Ok(format!(
            "(json_populate_record(NULL::{t}, {p}::json)).{f}",
            t = quote_identifier(&self.table),
            p = param,
            f = quote_identifier(field),
        ))
    }

    fn column(&self, field: &str) -> String {
        format!("{}.{}", quote_identifier(&self.table), quote_identifier(field))
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}
