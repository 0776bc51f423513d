//! In-process `DataStore` used by tests and local demos.
//!
//! Filters compare values as text; `gte`/`lte` compare numerically when both
//! sides parse as numbers. Tables must be declared with `with_table` before
//! use, mirroring a relational store rejecting unknown relations.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{DataStore, Row, StoreError};
use crate::filter::{Clause, FilterOrderInfo, QueryOperation, SortDirection, TableOperation};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` seeded with `rows`. Rows without an `id` get one.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        let mut table = Table::default();
        for row in rows {
            if let Value::Object(row) = row {
                table.push(row);
            }
        }
        self.tables.get_mut().insert(name.into(), table);
        self
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

impl Table {
    fn push(&mut self, mut row: Row) -> Row {
        match row.get("id").and_then(Value::as_i64) {
            Some(id) => self.next_id = self.next_id.max(id),
            None => {
                self.next_id += 1;
                row.insert("id".to_string(), Value::from(self.next_id));
            }
        }
        self.rows.push(row.clone());
        row
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn execute(&self, operation: &TableOperation) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(operation.table())
            .ok_or_else(|| StoreError::Rejected(format!("relation \"{}\" does not exist", operation.table())))?;

        match operation {
            TableOperation::Select(query) => Ok(select(&table.rows, query)),
            TableOperation::Insert { rows, .. } => Ok(rows.iter().cloned().map(|row| table.push(row)).collect()),
            TableOperation::Update { query, changes } => {
                let mut updated = vec![];
                for row in table.rows.iter_mut().filter(|row| matches_all(row, query)) {
                    for (key, value) in changes {
                        row.insert(key.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
                Ok(updated)
            }
            TableOperation::Delete { query } => {
                let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut table.rows)
                    .into_iter()
                    .partition(|row| matches_all(row, query));
                table.rows = kept;
                Ok(removed)
            }
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn select(rows: &[Row], query: &QueryOperation) -> Vec<Row> {
    let mut matched: Vec<Row> = rows.iter().filter(|row| matches_all(row, query)).cloned().collect();

    let ordering = query.ordering();
    if !ordering.is_empty() {
        matched.sort_by(|a, b| compare_rows(a, b, &ordering));
    }
    if let Some(limit) = query.limit() {
        matched.truncate(limit as usize);
    }

    let projection = query.projection();
    if projection.is_empty() {
        return matched;
    }
    matched
        .into_iter()
        .map(|row| {
            projection
                .iter()
                .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

fn matches_all(row: &Row, query: &QueryOperation) -> bool {
    query.filters().all(|clause| matches(row, clause))
}

fn matches(row: &Row, clause: &Clause) -> bool {
    let Some(field) = clause.filter_field() else {
        return true;
    };
    let Some(actual) = row.get(field).and_then(as_text) else {
        return false;
    };
    match clause {
        Clause::Equals { value, .. } => actual == *value,
        Clause::GreaterOrEqual { value, .. } => compare_text(&actual, value) != Ordering::Less,
        Clause::LessOrEqual { value, .. } => compare_text(&actual, value) != Ordering::Greater,
        Clause::In { values, .. } => values.contains(&actual),
        _ => true,
    }
}

fn compare_rows(a: &Row, b: &Row, ordering: &[&FilterOrderInfo]) -> Ordering {
    for info in ordering {
        let left = a.get(&info.column).and_then(as_text);
        let right = b.get(&info.column).and_then(as_text);
        let order = match (left, right) {
            (Some(l), Some(r)) => compare_text(&l, &r),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let order = match info.sort {
            SortDirection::Asc => order,
            SortDirection::Desc => order.reverse(),
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

fn compare_text(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
