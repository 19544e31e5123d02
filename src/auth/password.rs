//! Password hashing and verification using Argon2
//!
//! Stored hashes are PHC strings (argon2id, default parameters); the plain
//! password never leaves this module.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::CivicError;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reject passwords that are too short to be useful
pub fn check_password_policy(password: &str) -> Result<(), CivicError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CivicError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, CivicError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CivicError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CivicError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| CivicError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pothole-on-5th-street").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("pothole-on-5th-street", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(check_password_policy("abc").is_err());
        assert!(check_password_policy("Admin123").is_ok());
    }
}
