//! Password hashing and verification using Argon2
//!
//! Hashes are PHC strings (argon2id, default parameters) stored on the user document.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::TrackerError;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, TrackerError> {
    if password.is_empty() {
        return Err(TrackerError::InvalidInput("Password must not be empty".into()));
    }

    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TrackerError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, TrackerError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| TrackerError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
