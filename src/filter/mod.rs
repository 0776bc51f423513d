pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod translate;
pub mod sql;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter::Filter;
pub use translate::Translator;
pub use sql::SqlBuilder;
