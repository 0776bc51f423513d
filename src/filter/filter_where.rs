use super::error::FilterError;
use super::filter::validate_column;
use super::types::Clause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    In,
}

/// Parser for the row-filter shapes of the query-string grammar.
///
/// Two spellings are accepted:
/// - operator in the key: `age=gte.18` (operand in the key, or in the value when
///   the key stops at the dot, e.g. key `age=gte.` with value `18`)
/// - operator in the value: key `age`, value `gte.18`
pub struct FilterWhere;

impl FilterWhere {
    /// Returns `Ok(None)` when the pair is not a filter at all.
    pub fn parse(key: &str, value: &str) -> Result<Option<Clause>, FilterError> {
        match key.split_once('=') {
            Some((field, rest)) => Self::parse_keyed(key, field, rest, value).map(Some),
            None => Self::parse_valued(key, value),
        }
    }

    fn parse_keyed(key: &str, field: &str, rest: &str, value: &str) -> Result<Clause, FilterError> {
        if field.is_empty() {
            return Err(FilterError::MalformedKey(key.to_string()));
        }
        let (op, operand) = rest
            .split_once('.')
            .ok_or_else(|| FilterError::MalformedKey(key.to_string()))?;
        let operator = Self::map_operator(op)?;
        validate_column(field)?;
        let operand = if operand.is_empty() { value } else { operand };
        Self::build(field, operator, operand)
    }

    fn parse_valued(field: &str, value: &str) -> Result<Option<Clause>, FilterError> {
        let Some((op, operand)) = value.split_once('.') else {
            return Ok(None);
        };
        let Ok(operator) = Self::map_operator(op) else {
            return Ok(None);
        };
        validate_column(field)?;
        Self::build(field, operator, operand).map(Some)
    }

    fn map_operator(op: &str) -> Result<FilterOp, FilterError> {
        Ok(match op {
            "eq" => FilterOp::Eq,
            "gte" => FilterOp::Gte,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build(field: &str, operator: FilterOp, operand: &str) -> Result<Clause, FilterError> {
        let field = field.to_string();
        let value = operand.to_string();
        Ok(match operator {
            FilterOp::Eq => Clause::Equals { field, value },
            FilterOp::Gte => Clause::GreaterOrEqual { field, value },
            FilterOp::Lte => Clause::LessOrEqual { field, value },
            FilterOp::In => {
                let values = Self::parse_list(&field, operand)?;
                Clause::In { field, values }
            }
        })
    }

    /// `(a,b,c)` -> `[a, b, c]`. Parentheses are mandatory, items may not be empty.
    fn parse_list(field: &str, raw: &str) -> Result<Vec<String>, FilterError> {
        let invalid = || FilterError::InvalidList { field: field.to_string(), value: raw.to_string() };
        let inner = raw
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let values: Vec<String> = inner.split(',').map(|v| v.trim().to_string()).collect();
        if values.iter().any(|v| v.is_empty()) {
            return Err(invalid());
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_in_key() {
        assert_eq!(
            FilterWhere::parse("age=gte.18", "").unwrap(),
            Some(Clause::GreaterOrEqual { field: "age".into(), value: "18".into() })
        );
        assert_eq!(
            FilterWhere::parse("age=lte.65", "").unwrap(),
            Some(Clause::LessOrEqual { field: "age".into(), value: "65".into() })
        );
        assert_eq!(
            FilterWhere::parse("status=eq.", "aberto").unwrap(),
            Some(Clause::equals("status", "aberto"))
        );
    }

    #[test]
    fn operator_in_value() {
        assert_eq!(
            FilterWhere::parse("nome", "eq.Loja 1").unwrap(),
            Some(Clause::equals("nome", "Loja 1"))
        );
        assert_eq!(FilterWhere::parse("nome", "Loja 1").unwrap(), None);
        assert_eq!(FilterWhere::parse("nome", "like.x").unwrap(), None);
    }

    #[test]
    fn in_list_is_split() {
        assert_eq!(
            FilterWhere::parse("id=in.(1,2,3)", "").unwrap(),
            Some(Clause::In { field: "id".into(), values: vec!["1".into(), "2".into(), "3".into()] })
        );
        assert_eq!(
            FilterWhere::parse("id", "in.(7)").unwrap(),
            Some(Clause::In { field: "id".into(), values: vec!["7".into()] })
        );
    }

    #[test]
    fn malformed_in_list_is_rejected() {
        for key in ["id=in.1,2", "id=in.(1,2", "id=in.()", "id=in.(1,,2)"] {
            assert!(
                matches!(FilterWhere::parse(key, ""), Err(FilterError::InvalidList { .. })),
                "accepted {}",
                key
            );
        }
    }

    #[test]
    fn unknown_operator_in_key_is_rejected() {
        assert_eq!(
            FilterWhere::parse("age=gt.18", ""),
            Err(FilterError::UnsupportedOperator("gt".into()))
        );
        assert_eq!(FilterWhere::parse("age=18", ""), Err(FilterError::MalformedKey("age=18".into())));
        assert_eq!(FilterWhere::parse("=eq.1", ""), Err(FilterError::MalformedKey("=eq.1".into())));
    }

    #[test]
    fn field_must_be_identifier() {
        assert!(matches!(
            FilterWhere::parse("a;drop=eq.1", ""),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(FilterWhere::parse("a b", "eq.1"), Err(FilterError::InvalidColumn(_))));
    }
}
