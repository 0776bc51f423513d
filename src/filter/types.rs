use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// One typed piece of a query, parsed from a single query-string pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clause {
    Equals { field: String, value: String },
    GreaterOrEqual { field: String, value: String },
    LessOrEqual { field: String, value: String },
    In { field: String, values: Vec<String> },
    Select(Vec<String>),
    Order(Vec<FilterOrderInfo>),
    Limit(u32),
}

impl Clause {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Clause::Equals { field: field.into(), value: value.into() }
    }

    /// Field a row filter applies to; `None` for projection, ordering and limits.
    pub fn filter_field(&self) -> Option<&str> {
        match self {
            Clause::Equals { field, .. }
            | Clause::GreaterOrEqual { field, .. }
            | Clause::LessOrEqual { field, .. }
            | Clause::In { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_filter(&self) -> bool {
        self.filter_field().is_some()
    }
}

/// Ordered clauses against one table. Filters compose as logical AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOperation {
    pub table: String,
    pub clauses: Vec<Clause>,
}

impl QueryOperation {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), clauses: vec![] }
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn filters(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|c| c.is_filter())
    }

    /// Last `select` wins; empty means every column.
    pub fn projection(&self) -> &[String] {
        self.clauses
            .iter()
            .rev()
            .find_map(|c| match c {
                Clause::Select(columns) => Some(columns.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn ordering(&self) -> Vec<&FilterOrderInfo> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Order(infos) => Some(infos.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn limit(&self) -> Option<u32> {
        self.clauses.iter().rev().find_map(|c| match c {
            Clause::Limit(n) => Some(*n),
            _ => None,
        })
    }

    /// Equality clauses on `field`, used to check branch scoping.
    pub fn equality_on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.clauses.iter().filter_map(move |c| match c {
            Clause::Equals { field: f, value } if f == field => Some(value.as_str()),
            _ => None,
        })
    }
}

/// A translated request, ready for the data store.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    Select(QueryOperation),
    Insert { table: String, rows: Vec<Map<String, Value>> },
    Update { query: QueryOperation, changes: Map<String, Value> },
    Delete { query: QueryOperation },
}

impl TableOperation {
    pub fn table(&self) -> &str {
        match self {
            TableOperation::Select(query)
            | TableOperation::Update { query, .. }
            | TableOperation::Delete { query } => &query.table,
            TableOperation::Insert { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
