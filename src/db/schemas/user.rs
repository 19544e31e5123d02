//! User document schema
//!
//! Stores credentials, role and profile of citizens, officials and admins.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub username: String,

    pub email: String,

    /// Display name (defaults to username)
    pub name: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    /// Set by an admin; officials act only once verified
    #[serde(default)]
    pub is_verified: bool,

    /// Municipal department an official belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub location_access: bool,

    #[serde(default = "default_true")]
    pub notifications: bool,

    #[serde(default)]
    pub followers: Vec<ObjectId>,

    #[serde(default)]
    pub following: Vec<ObjectId>,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document
    pub fn new(username: String, email: String, name: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            username,
            email,
            name,
            password_hash,
            role: Role::Citizen,
            is_verified: false,
            department: None,
            bio: None,
            avatar: None,
            is_private: false,
            location_access: false,
            notifications: true,
            followers: Vec::new(),
            following: Vec::new(),
        }
    }

    /// Hex id, empty for unsaved documents
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Partial update to a user; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_private: Option<bool>,
    pub location_access: Option<bool>,
    pub notifications: Option<bool>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub is_verified: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }

    /// Apply the patch to an in-memory document
    pub fn apply(&self, user: &mut UserDoc) {
        if let Some(ref name) = self.name {
            user.name = name.clone();
        }
        if let Some(ref bio) = self.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(ref avatar) = self.avatar {
            user.avatar = Some(avatar.clone());
        }
        if let Some(is_private) = self.is_private {
            user.is_private = is_private;
        }
        if let Some(location_access) = self.location_access {
            user.location_access = location_access;
        }
        if let Some(notifications) = self.notifications {
            user.notifications = notifications;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(ref department) = self.department {
            user.department = Some(department.clone());
        }
        if let Some(is_verified) = self.is_verified {
            user.is_verified = is_verified;
        }
        user.metadata.touch();
    }

    /// `$set` document for MongoDB
    pub fn to_set_document(&self) -> Document {
        let mut set = doc! { "metadata.updated_at": bson::DateTime::now() };
        if let Some(ref name) = self.name {
            set.insert("name", name);
        }
        if let Some(ref bio) = self.bio {
            set.insert("bio", bio);
        }
        if let Some(ref avatar) = self.avatar {
            set.insert("avatar", avatar);
        }
        if let Some(is_private) = self.is_private {
            set.insert("is_private", is_private);
        }
        if let Some(location_access) = self.location_access {
            set.insert("location_access", location_access);
        }
        if let Some(notifications) = self.notifications {
            set.insert("notifications", notifications);
        }
        if let Some(role) = self.role {
            set.insert("role", role.as_str());
        }
        if let Some(ref department) = self.department {
            set.insert("department", department);
        }
        if let Some(is_verified) = self.is_verified {
            set.insert("is_verified", is_verified);
        }
        set
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "role": 1 },
                Some(IndexOptions::builder().name("role_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_apply() {
        let mut user = UserDoc::new("ravi".into(), "ravi@example.com".into(), "Ravi".into(), "h".into());
        let patch = UserPatch {
            role: Some(Role::Official),
            department: Some("Sanitation".into()),
            is_verified: Some(true),
            ..UserPatch::default()
        };
        patch.apply(&mut user);

        assert_eq!(user.role, Role::Official);
        assert_eq!(user.department.as_deref(), Some("Sanitation"));
        assert!(user.is_verified);
        assert_eq!(user.name, "Ravi");
    }

    #[test]
    fn test_patch_set_document() {
        let patch = UserPatch {
            name: Some("New".into()),
            role: Some(Role::Admin),
            ..UserPatch::default()
        };
        let set = patch.to_set_document();
        assert_eq!(set.get_str("name").unwrap(), "New");
        assert_eq!(set.get_str("role").unwrap(), "admin");
        assert!(!set.contains_key("bio"));
        assert!(UserPatch::default().is_empty());
    }
}
