//! Error types for civicconnect
//!
//! Every handler error is rendered as `{"status": "error", "message": ...}`
//! with the status code from [`CivicError::status_code`].

use hyper::StatusCode;

/// Main error type for civicconnect operations
#[derive(Debug, thiserror::Error)]
pub enum CivicError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Unique-key collision (duplicate email, username, admin)
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CivicError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Clients only distinguish 400/401/403/404
            Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<std::io::Error> for CivicError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CivicError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for CivicError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for CivicError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        // E11000 duplicate key
        if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
            if write_error.code == 11000 {
                return Self::Conflict("Duplicate key".into());
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<bson::oid::Error> for CivicError {
    fn from(err: bson::oid::Error) -> Self {
        Self::BadRequest(format!("Invalid id: {}", err))
    }
}

impl From<bson::ser::Error> for CivicError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON serialization failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for CivicError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for civicconnect operations
pub type Result<T> = std::result::Result<T, CivicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CivicError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CivicError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(CivicError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CivicError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CivicError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_client_errors_display_bare_message() {
        let err = CivicError::bad_request("Comment text is required");
        assert_eq!(err.to_string(), "Comment text is required");
    }

    #[test]
    fn test_invalid_object_id() {
        let err: CivicError = bson::oid::ObjectId::parse_str("nope").unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
