pub mod credentials;
pub mod password;
pub mod session_cache;
pub mod token;

pub use credentials::{CredentialError, CredentialVerifier, Identity, IdentityLookup, IdentityRepository};
pub use password::{hash_password, verify_password, PasswordError};
pub use session_cache::{SessionCache, SessionError};
pub use token::{Claims, TokenCodec, TokenError};
