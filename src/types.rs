/// Shared types used across the codebase

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Data operations the gateway can perform against a table.
/// Derived from the HTTP method of a proxy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Select,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// GET/POST/PATCH/DELETE map onto an operation; every other method is unsupported.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Operation::Select),
            Method::POST => Some(Operation::Create),
            Method::PATCH => Some(Operation::Update),
            Method::DELETE => Some(Operation::Delete),
            _ => None,
        }
    }
}
