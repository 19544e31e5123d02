//! Authentication and authorization for civicconnect
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Role checks for official-only and admin-only endpoints

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use password::{check_password_policy, hash_password, verify_password};
pub use permissions::{require_admin, require_verified_official, Role};
