pub mod auth;
pub mod cors;

pub use auth::{Authenticator, HeaderCredentials, Principal, SessionToken};
