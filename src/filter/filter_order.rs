use super::error::FilterError;
use super::filter::{quote_identifier, validate_column};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `field.direction[,field.direction...]`.
    /// `asc` sorts ascending; a missing or any other direction sorts descending.
    pub fn validate_and_parse(order: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in order.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (column, direction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
            validate_column(column)?;
            let sort = if direction.eq_ignore_ascii_case("asc") {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            };
            out.push(FilterOrderInfo { column: column.to_string(), sort });
        }
        if out.is_empty() {
            return Err(FilterError::InvalidOrder(order.to_string()));
        }
        Ok(out)
    }

    pub fn generate(table: &str, infos: &[&FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.{} {}", quote_identifier(table), quote_identifier(&i.column), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
