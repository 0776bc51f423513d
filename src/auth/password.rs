use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Random salt unavailable: {0}")]
    Salt(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Password check did not complete: {0}")]
    Join(String),
}

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// False for a wrong password and for anything that is not a PHC string.
///
/// Argon2 is CPU-bound, so the check runs on the blocking thread pool.
pub async fn verify_password(hash: &str, password: &str) -> Result<bool, PasswordError> {
    let hash = hash.to_string();
    let password = password.to_string();

    tokio::task::spawn_blocking(move || matches_hash(&hash, &password))
        .await
        .map_err(|e| PasswordError::Join(e.to_string()))
}

fn matches_hash(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("s3nha").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "s3nha").await.unwrap());
        assert!(!verify_password(&hash, "S3nha").await.unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("x").unwrap(), hash_password("x").unwrap());
    }

    #[tokio::test]
    async fn plaintext_storage_never_matches() {
        assert!(!verify_password("s3nha", "s3nha").await.unwrap());
        assert!(!verify_password("", "").await.unwrap());
    }
}
