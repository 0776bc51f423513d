use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Malformed filter key: {0}")]
    MalformedKey(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid list for {field}: {value}")]
    InvalidList { field: String, value: String },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0} requires at least one eq. filter")]
    UnfilteredMutation(&'static str),
}
