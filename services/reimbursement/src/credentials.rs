//! Password hashing for stored credentials

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::error::{DatabaseError, DatabaseResult};

/// Hash a cleartext password into an Argon2 PHC string
pub fn hash_password(password: &str) -> DatabaseResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DatabaseError::Credential(format!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(hash)
}

/// Check a cleartext password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> DatabaseResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| DatabaseError::Credential(format!("Failed to parse password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
