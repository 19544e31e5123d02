//! JSON shapes returned by the API
//!
//! Documents are stored snake_case with `ObjectId`s; clients receive
//! camelCase with hex `_id`s, RFC 3339 timestamps and user references
//! populated into summaries. Password hashes never leave this module.

use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::auth::Role;
use crate::db::schemas::{
    CommentDoc, GeoLocation, IssueCategory, IssueDoc, IssueStatus, Severity, UserDoc, WardDoc,
};
use crate::db::CivicStore;
use crate::feed::urgency_score;
use crate::types::Result;

fn rfc3339(dt: bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

/// Public fields of a referenced user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl From<&UserDoc> for UserSummary {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            name: user.name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            is_verified: user.is_verified,
            department: user.department.clone(),
        }
    }
}

/// A user reference, populated when the user still exists
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

/// Profile fields shared by every user rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_private: bool,
    pub location_access: bool,
    pub notifications: bool,
    pub created_at: String,
}

impl From<&UserDoc> for UserFields {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            is_verified: user.is_verified,
            department: user.department.clone(),
            bio: user.bio.clone(),
            avatar: user.avatar.clone(),
            is_private: user.is_private,
            location_access: user.location_access,
            notifications: user.notifications,
            created_at: user.metadata.created().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// A user with follow edges as ids
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub fields: UserFields,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}

impl From<&UserDoc> for UserView {
    fn from(user: &UserDoc) -> Self {
        Self {
            fields: UserFields::from(user),
            followers: hex_ids(&user.followers),
            following: hex_ids(&user.following),
        }
    }
}

/// A user with follow edges populated
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub fields: UserFields,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
}

pub async fn profile_view(store: &dyn CivicStore, user: &UserDoc) -> Result<ProfileView> {
    let mut ids = user.followers.clone();
    ids.extend(user.following.iter().copied());
    let directory = Directory::load(store, ids).await?;

    Ok(ProfileView {
        fields: UserFields::from(user),
        followers: directory.summaries(&user.followers),
        following: directory.summaries(&user.following),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: UserRef,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub ward_number: String,
    pub zone_number: String,
    pub location: GeoLocation,
    pub severity: Severity,
    pub status: IssueStatus,
    pub images: Vec<String>,
    pub reported_by: UserRef,
    pub upvotes: Vec<String>,
    pub downvotes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub official_replies: Vec<CommentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_official: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub urgency_score: f64,
}

/// Users referenced by a batch of documents, fetched in one query
pub struct Directory {
    users: HashMap<ObjectId, UserSummary>,
}

impl Directory {
    pub async fn load(store: &dyn CivicStore, ids: Vec<ObjectId>) -> Result<Self> {
        let unique: Vec<ObjectId> = ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users = store
            .get_users(&unique)
            .await?
            .iter()
            .filter_map(|u| u._id.map(|id| (id, UserSummary::from(u))))
            .collect();
        Ok(Self { users })
    }

    pub fn reference(&self, id: &ObjectId) -> UserRef {
        match self.users.get(id) {
            Some(summary) => UserRef::Populated(summary.clone()),
            None => UserRef::Id(id.to_hex()),
        }
    }

    /// Summaries of the users that still exist, in input order
    pub fn summaries(&self, ids: &[ObjectId]) -> Vec<UserSummary> {
        ids.iter().filter_map(|id| self.users.get(id).cloned()).collect()
    }

    fn comment(&self, comment: &CommentDoc) -> CommentView {
        CommentView {
            id: comment._id.to_hex(),
            user: self.reference(&comment.user),
            text: comment.text.clone(),
            created_at: rfc3339(comment.created_at),
        }
    }

    pub fn issue(&self, issue: &IssueDoc, now: DateTime<Utc>) -> IssueView {
        IssueView {
            id: issue.id_hex(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            category: issue.category,
            ward_number: issue.ward_number.clone(),
            zone_number: issue.zone_number.clone(),
            location: issue.location.clone(),
            severity: issue.severity,
            status: issue.status,
            images: issue.images.clone(),
            reported_by: self.reference(&issue.reported_by),
            upvotes: hex_ids(&issue.upvotes),
            downvotes: hex_ids(&issue.downvotes),
            comments: issue.comments.iter().map(|c| self.comment(c)).collect(),
            official_replies: issue.official_replies.iter().map(|c| self.comment(c)).collect(),
            assigned_department: issue.assigned_department.clone(),
            assigned_official: issue.assigned_official.clone(),
            resolution_eta: issue.resolution_eta.map(rfc3339),
            acknowledged_at: issue.acknowledged_at.map(rfc3339),
            resolved_at: issue.resolved_at.map(rfc3339),
            created_at: issue
                .metadata
                .created()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: issue.metadata.updated_at.map(rfc3339),
            urgency_score: urgency_score(issue, now),
        }
    }
}

pub fn referenced_users<'a>(issues: impl IntoIterator<Item = &'a IssueDoc>) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    for issue in issues {
        ids.push(issue.reported_by);
        ids.extend(issue.comments.iter().map(|c| c.user));
        ids.extend(issue.official_replies.iter().map(|c| c.user));
    }
    ids
}

/// Render issues with populated users, keeping their order
pub async fn issue_views(
    store: &dyn CivicStore,
    issues: &[IssueDoc],
    now: DateTime<Utc>,
) -> Result<Vec<IssueView>> {
    let directory = Directory::load(store, referenced_users(issues)).await?;
    Ok(issues.iter().map(|i| directory.issue(i, now)).collect())
}

pub async fn issue_view(
    store: &dyn CivicStore,
    issue: &IssueDoc,
    now: DateTime<Utc>,
) -> Result<IssueView> {
    let directory = Directory::load(store, referenced_users([issue])).await?;
    Ok(directory.issue(issue, now))
}

pub async fn comment_view(store: &dyn CivicStore, comment: &CommentDoc) -> Result<CommentView> {
    let directory = Directory::load(store, vec![comment.user]).await?;
    Ok(directory.comment(comment))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WardView {
    #[serde(rename = "_id")]
    pub id: String,
    pub city: String,
    pub ward_number: String,
    pub zone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&WardDoc> for WardView {
    fn from(ward: &WardDoc) -> Self {
        Self {
            id: ward._id.map(|id| id.to_hex()).unwrap_or_default(),
            city: ward.city.clone(),
            ward_number: ward.ward_number.clone(),
            zone_number: ward.zone_number.clone(),
            name: ward.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_user_view_hides_password() {
        let user = UserDoc {
            _id: Some(ObjectId::new()),
            is_verified: true,
            ..UserDoc::new("meena".into(), "m@example.com".into(), "Meena".into(), "secret-hash".into())
        };
        let json = serde_json::to_value(UserView::from(&user)).unwrap();

        assert_eq!(json["username"], "meena");
        assert_eq!(json["isVerified"], true);
        assert_eq!(json["role"], "citizen");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("secret-hash"));
    }

    #[tokio::test]
    async fn test_issue_view_populates_reporter() {
        let store = MemoryStore::new();
        let reporter = store
            .insert_user(UserDoc::new("ravi".into(), "r@example.com".into(), "Ravi".into(), "h".into()))
            .await
            .unwrap();
        let ghost = ObjectId::new();
        let issue = IssueDoc {
            _id: Some(ObjectId::new()),
            title: "Broken lamp".into(),
            category: IssueCategory::NoStreetLights,
            reported_by: reporter._id.unwrap(),
            comments: vec![CommentDoc::new(ghost, "still dark".into())],
            ..IssueDoc::default()
        };

        let view = issue_view(&store, &issue, Utc::now()).await.unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["reportedBy"]["username"], "ravi");
        assert_eq!(json["category"], "No Street Lights");
        assert_eq!(json["comments"][0]["user"], ghost.to_hex());
        assert!(json["urgencyScore"].is_number());
    }
}
