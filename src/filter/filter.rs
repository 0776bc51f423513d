use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{Clause, QueryOperation};

/// Turns query-string pairs into an ordered `QueryOperation`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    max_limit: Option<u32>,
}

impl Filter {
    pub fn new(max_limit: Option<u32>) -> Self {
        Self { max_limit }
    }

    /// Every recognized pair becomes one clause, in input order.
    /// Unrecognized pairs are skipped; malformed recognized pairs fail the whole parse.
    pub fn parse(&self, table: &str, params: &[(String, String)]) -> Result<QueryOperation, FilterError> {
        validate_table_name(table)?;
        let mut query = QueryOperation::new(table);
        for (key, value) in params {
            if let Some(clause) = self.parse_pair(key, value)? {
                query.clauses.push(clause);
            }
        }
        Ok(query)
    }

    pub fn parse_pair(&self, key: &str, value: &str) -> Result<Option<Clause>, FilterError> {
        match key {
            "select" => Self::select(value).map(Some),
            "order" => FilterOrder::validate_and_parse(value).map(|infos| Some(Clause::Order(infos))),
            "limit" => self.limit(value).map(Some),
            _ => FilterWhere::parse(key, value),
        }
    }

    fn select(value: &str) -> Result<Clause, FilterError> {
        let columns: Vec<String> = value
            .split(',')
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        for column in &columns {
            if column != "*" {
                validate_column(column)?;
            }
        }
        if columns.iter().any(|c| c == "*") {
            return Ok(Clause::Select(vec![]));
        }
        Ok(Clause::Select(columns))
    }

    fn limit(&self, value: &str) -> Result<Clause, FilterError> {
        let limit: u32 = value
            .trim()
            .parse()
            .map_err(|_| FilterError::InvalidLimit(format!("'{}' is not a non-negative integer", value)))?;

        let applied = match self.max_limit {
            Some(max) if limit > max => {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        };
        Ok(Clause::Limit(applied))
    }
}

pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if !is_identifier(name) {
        return Err(FilterError::InvalidTableName(format!("Invalid table name format: '{}'", name)));
    }
    Ok(())
}

pub fn validate_column(name: &str) -> Result<(), FilterError> {
    if !is_identifier(name) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: '{}'", name)));
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_every_recognized_key_in_order() {
        let filter = Filter::new(None);
        let query = filter
            .parse(
                "lojas",
                &pairs(&[
                    ("age=gte.18", ""),
                    ("select", "id, nome"),
                    ("cache_buster", "123"),
                    ("order", "nome.asc"),
                    ("limit", "20"),
                    ("id=in.(1,2,3)", ""),
                ]),
            )
            .unwrap();

        assert_eq!(query.table, "lojas");
        assert_eq!(query.clauses.len(), 5);
        assert_eq!(
            query.clauses[0],
            Clause::GreaterOrEqual { field: "age".into(), value: "18".into() }
        );
        assert_eq!(query.projection(), ["id".to_string(), "nome".to_string()]);
        assert_eq!(query.ordering()[0].sort, SortDirection::Asc);
        assert_eq!(query.limit(), Some(20));
        assert_eq!(query.filters().count(), 2);
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let filter = Filter::new(None);
        for bad in ["abc", "-1", "1.5", ""] {
            assert!(
                matches!(filter.parse("lojas", &pairs(&[("limit", bad)])), Err(FilterError::InvalidLimit(_))),
                "accepted limit {:?}",
                bad
            );
        }
    }

    #[test]
    fn limit_is_capped() {
        let filter = Filter::new(Some(100));
        let query = filter.parse("lojas", &pairs(&[("limit", "5000")])).unwrap();
        assert_eq!(query.limit(), Some(100));
    }

    #[test]
    fn select_star_means_all_columns() {
        let filter = Filter::new(None);
        let query = filter.parse("lojas", &pairs(&[("select", "*")])).unwrap();
        assert!(query.projection().is_empty());
        assert!(filter.parse("lojas", &pairs(&[("select", "id,nome;--")])).is_err());
    }

    #[test]
    fn validates_table_names() {
        assert!(validate_table_name("veiculos_status_historico").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1lojas").is_err());
        assert!(validate_table_name("lojas\"; drop").is_err());
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("nome"), "\"nome\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
