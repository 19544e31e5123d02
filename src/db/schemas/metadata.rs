//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps.

use bson::DateTime;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }

    /// Metadata for a document created at a specific time
    pub fn created_at(at: chrono::DateTime<Utc>) -> Self {
        let at = DateTime::from_chrono(at);
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(at),
            created_at: Some(at),
        }
    }

    /// Mark the document as modified now
    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }

    /// Creation time, falling back to the epoch for legacy documents
    pub fn created(&self) -> chrono::DateTime<Utc> {
        self.created_at
            .map(|dt| dt.to_chrono())
            .unwrap_or_default()
    }
}
