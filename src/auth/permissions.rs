//! User roles and the guards for role-restricted endpoints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::schemas::UserDoc;
use crate::types::CivicError;

/// Role of a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reports, votes and comments
    #[default]
    Citizen,
    /// Acknowledges, replies to and resolves issues (once verified)
    Official,
    /// Manages users, wards and demo data
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Official => "official",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "official" => Ok(Role::Official),
            "admin" => Ok(Role::Admin),
            other => Err(CivicError::bad_request(format!("Unknown role: {}", other))),
        }
    }
}

/// Admin-only endpoints
pub fn require_admin(user: &UserDoc) -> Result<(), CivicError> {
    if user.role != Role::Admin {
        return Err(CivicError::Forbidden("Admin access required".into()));
    }
    Ok(())
}

/// Official actions require the official role and admin verification.
/// Admins do not pass this check.
pub fn require_verified_official(user: &UserDoc) -> Result<(), CivicError> {
    if user.role != Role::Official || !user.is_verified {
        return Err(CivicError::Forbidden(
            "Verified official access required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, is_verified: bool) -> UserDoc {
        UserDoc {
            role,
            is_verified,
            ..UserDoc::default()
        }
    }

    #[test]
    fn test_admin_guard() {
        assert!(require_admin(&user(Role::Admin, true)).is_ok());
        assert!(require_admin(&user(Role::Official, true)).is_err());
        assert!(require_admin(&user(Role::Citizen, false)).is_err());
    }

    #[test]
    fn test_verified_official_guard() {
        assert!(require_verified_official(&user(Role::Official, true)).is_ok());
        assert!(require_verified_official(&user(Role::Official, false)).is_err());
        assert!(require_verified_official(&user(Role::Citizen, true)).is_err());
        assert!(require_verified_official(&user(Role::Admin, true)).is_err());
    }

    #[test]
    fn test_role_parse_and_serde() {
        assert_eq!("Official".parse::<Role>().unwrap(), Role::Official);
        assert!("mayor".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert!(Role::Admin > Role::Official);
    }
}
