//! Ward document schema
//!
//! Wards are the administrative subdivisions an issue must be filed under.
//! `(city, ward_number, zone_number)` is unique.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for wards
pub const WARD_COLLECTION: &str = "wards";

/// Ward document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WardDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub city: String,

    pub ward_number: String,

    pub zone_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WardDoc {
    pub fn new(city: &str, ward_number: &str, zone_number: &str, name: Option<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            city: city.to_string(),
            ward_number: ward_number.to_string(),
            zone_number: zone_number.to_string(),
            name,
        }
    }

    /// Composite key filter
    pub fn key_filter(&self) -> Document {
        doc! {
            "city": &self.city,
            "ward_number": &self.ward_number,
            "zone_number": &self.zone_number,
        }
    }
}

/// Counts reported by a ward upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub upserted: u64,
    pub modified: u64,
}

impl IntoIndexes for WardDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "city": 1, "ward_number": 1, "zone_number": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("city_ward_zone_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for WardDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
