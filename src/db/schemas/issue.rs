//! Issue document schema
//!
//! An issue is a located civic complaint with its votes, comments and the
//! official handling state embedded in a single document.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::CivicError;

/// Collection name for issues
pub const ISSUE_COLLECTION: &str = "issues";

/// Issue category
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    #[serde(rename = "Water Logging")]
    WaterLogging,
    #[serde(rename = "Stray Dogs")]
    StrayDogs,
    #[serde(rename = "Road Damage")]
    RoadDamage,
    #[serde(rename = "No Street Lights")]
    NoStreetLights,
    #[serde(rename = "Uncemented Road")]
    UncementedRoad,
    Infrastructure,
    Sanitation,
    Safety,
    Environment,
    #[default]
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 10] = [
        IssueCategory::WaterLogging,
        IssueCategory::StrayDogs,
        IssueCategory::RoadDamage,
        IssueCategory::NoStreetLights,
        IssueCategory::UncementedRoad,
        IssueCategory::Infrastructure,
        IssueCategory::Sanitation,
        IssueCategory::Safety,
        IssueCategory::Environment,
        IssueCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::WaterLogging => "Water Logging",
            IssueCategory::StrayDogs => "Stray Dogs",
            IssueCategory::RoadDamage => "Road Damage",
            IssueCategory::NoStreetLights => "No Street Lights",
            IssueCategory::UncementedRoad => "Uncemented Road",
            IssueCategory::Infrastructure => "Infrastructure",
            IssueCategory::Sanitation => "Sanitation",
            IssueCategory::Safety => "Safety",
            IssueCategory::Environment => "Environment",
            IssueCategory::Other => "Other",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CivicError::bad_request(format!("Unknown category: {}", s)))
    }
}

/// Lifecycle status; variants are declared in lifecycle order
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueStatus {
    #[default]
    Reported,
    Acknowledged,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Reported,
        IssueStatus::Acknowledged,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "Reported",
            IssueStatus::Acknowledged => "Acknowledged",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Resolved => "Resolved",
        }
    }

    /// Status never moves backwards; re-entering the same status is allowed
    pub fn can_advance_to(&self, next: IssueStatus) -> bool {
        next >= *self
    }

    /// Statuses an issue may be in when moving to `self`
    pub fn predecessors(self) -> Vec<IssueStatus> {
        IssueStatus::ALL
            .into_iter()
            .filter(|from| from.can_advance_to(self))
            .collect()
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CivicError::bad_request(format!("Unknown status: {}", s)))
    }
}

/// Official-assigned urgency tag
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Blue,
    Yellow,
    Red,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blue => "blue",
            Severity::Yellow => "yellow",
            Severity::Red => "red",
        }
    }
}

/// Where an issue was reported
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl GeoLocation {
    /// Zero coordinates mean "not captured"
    pub fn has_coordinates(&self) -> bool {
        self.lat != 0.0 && self.lng != 0.0 && self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Comment or official reply embedded in an issue
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommentDoc {
    pub _id: ObjectId,
    pub user: ObjectId,
    pub text: String,
    pub created_at: DateTime,
}

impl CommentDoc {
    pub fn new(user: ObjectId, text: String) -> Self {
        Self {
            _id: ObjectId::new(),
            user,
            text,
            created_at: DateTime::now(),
        }
    }
}

/// Which embedded list a comment goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentThread {
    Comments,
    OfficialReplies,
}

impl CommentThread {
    pub fn field(&self) -> &'static str {
        match self {
            CommentThread::Comments => "comments",
            CommentThread::OfficialReplies => "official_replies",
        }
    }
}

/// Issue document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IssueDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub description: String,

    pub category: IssueCategory,

    pub ward_number: String,

    #[serde(default)]
    pub zone_number: String,

    pub location: GeoLocation,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub status: IssueStatus,

    /// Media URLs
    #[serde(default)]
    pub images: Vec<String>,

    pub reported_by: ObjectId,

    #[serde(default)]
    pub upvotes: Vec<ObjectId>,

    #[serde(default)]
    pub downvotes: Vec<ObjectId>,

    #[serde(default)]
    pub comments: Vec<CommentDoc>,

    #[serde(default)]
    pub official_replies: Vec<CommentDoc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_official: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_eta: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime>,
}

impl Default for IssueDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title: String::new(),
            description: String::new(),
            category: IssueCategory::default(),
            ward_number: String::new(),
            zone_number: String::new(),
            location: GeoLocation::default(),
            severity: Severity::default(),
            status: IssueStatus::default(),
            images: Vec::new(),
            reported_by: ObjectId::from_bytes([0; 12]),
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            comments: Vec::new(),
            official_replies: Vec::new(),
            assigned_department: None,
            assigned_official: None,
            resolution_eta: None,
            acknowledged_at: None,
            resolved_at: None,
        }
    }
}

impl IssueDoc {
    pub fn net_votes(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Apply a status transition to an in-memory document
    pub fn apply(&mut self, transition: &IssueTransition) {
        let now = DateTime::now();
        self.status = transition.status;
        match transition.status {
            IssueStatus::Acknowledged => self.acknowledged_at = Some(now),
            IssueStatus::Resolved => self.resolved_at = Some(now),
            _ => {}
        }
        if let Some(eta) = transition.resolution_eta {
            self.resolution_eta = Some(eta);
        }
        if let Some(ref department) = transition.assigned_department {
            self.assigned_department = Some(department.clone());
        }
        if let Some(ref official) = transition.assigned_official {
            self.assigned_official = Some(official.clone());
        }
        if let Some(severity) = transition.severity {
            self.severity = severity;
        }
        self.metadata.touch();
    }
}

/// Filter for issue listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub category: Option<IssueCategory>,
    pub status: Option<IssueStatus>,
    pub ward_number: Option<String>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &IssueDoc) -> bool {
        self.category.map_or(true, |c| issue.category == c)
            && self.status.map_or(true, |s| issue.status == s)
            && self
                .ward_number
                .as_ref()
                .map_or(true, |w| &issue.ward_number == w)
    }

    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(category) = self.category {
            filter.insert("category", category.as_str());
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(ref ward) = self.ward_number {
            filter.insert("ward_number", ward);
        }
        filter
    }
}

/// Status change performed by an official
#[derive(Debug, Clone, Default)]
pub struct IssueTransition {
    pub status: IssueStatus,
    pub resolution_eta: Option<DateTime>,
    pub assigned_department: Option<String>,
    pub assigned_official: Option<String>,
    pub severity: Option<Severity>,
}

impl IssueTransition {
    pub fn to(status: IssueStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Matches `id` only while its status may still advance to the target
    pub fn guard_filter(&self, id: ObjectId) -> Document {
        let allowed: Vec<&str> = self
            .status
            .predecessors()
            .iter()
            .map(IssueStatus::as_str)
            .collect();
        doc! { "_id": id, "status": { "$in": allowed } }
    }

    /// `$set` document for MongoDB
    pub fn to_set_document(&self) -> Document {
        let now = DateTime::now();
        let mut set = doc! {
            "status": self.status.as_str(),
            "metadata.updated_at": now,
        };
        match self.status {
            IssueStatus::Acknowledged => {
                set.insert("acknowledged_at", now);
            }
            IssueStatus::Resolved => {
                set.insert("resolved_at", now);
            }
            _ => {}
        }
        if let Some(eta) = self.resolution_eta {
            set.insert("resolution_eta", eta);
        }
        if let Some(ref department) = self.assigned_department {
            set.insert("assigned_department", department);
        }
        if let Some(ref official) = self.assigned_official {
            set.insert("assigned_official", official);
        }
        if let Some(severity) = self.severity {
            set.insert("severity", severity.as_str());
        }
        set
    }
}

/// Result of applying a transition to an existing issue
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(IssueDoc),
    /// The issue had already moved past the target; carries its current status
    Rejected(IssueStatus),
}

/// Up or down vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// (field toggled, opposite field cleared)
    pub fn fields(&self) -> (&'static str, &'static str) {
        match self {
            VoteKind::Up => ("upvotes", "downvotes"),
            VoteKind::Down => ("downvotes", "upvotes"),
        }
    }
}

/// Result of a vote toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Whether the user's vote is now present
    pub active: bool,
    pub upvotes: usize,
    pub downvotes: usize,
}

/// Toggle `user`'s vote on an in-memory document
pub fn toggle_vote(issue: &mut IssueDoc, user: ObjectId, kind: VoteKind) -> VoteOutcome {
    let (target, opposite) = match kind {
        VoteKind::Up => (&mut issue.upvotes, &mut issue.downvotes),
        VoteKind::Down => (&mut issue.downvotes, &mut issue.upvotes),
    };
    let active = if target.contains(&user) {
        target.retain(|id| *id != user);
        false
    } else {
        target.push(user);
        opposite.retain(|id| *id != user);
        true
    };
    issue.metadata.touch();
    VoteOutcome {
        active,
        upvotes: issue.upvotes.len(),
        downvotes: issue.downvotes.len(),
    }
}

impl IntoIndexes for IssueDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "metadata.created_at": -1 },
                Some(IndexOptions::builder().name("created_desc".to_string()).build()),
            ),
            (
                doc! { "ward_number": 1, "zone_number": 1 },
                Some(IndexOptions::builder().name("ward_zone_index".to_string()).build()),
            ),
            (
                doc! { "category": 1, "status": 1 },
                Some(IndexOptions::builder().name("category_status_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for IssueDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&IssueCategory::NoStreetLights).unwrap(),
            "\"No Street Lights\""
        );
        assert_eq!("water logging".parse::<IssueCategory>().unwrap(), IssueCategory::WaterLogging);
        assert!("Potholes".parse::<IssueCategory>().is_err());
    }

    #[test]
    fn test_status_order() {
        assert_eq!(serde_json::to_string(&IssueStatus::InProgress).unwrap(), "\"In Progress\"");
        assert!(IssueStatus::Reported.can_advance_to(IssueStatus::Acknowledged));
        assert!(IssueStatus::Acknowledged.can_advance_to(IssueStatus::Resolved));
        assert!(!IssueStatus::Resolved.can_advance_to(IssueStatus::Acknowledged));
        assert!(IssueStatus::Resolved.can_advance_to(IssueStatus::Resolved));
    }

    #[test]
    fn test_vote_toggle() {
        let mut issue = IssueDoc::default();
        let user = ObjectId::new();

        let outcome = toggle_vote(&mut issue, user, VoteKind::Down);
        assert!(outcome.active);
        assert_eq!((outcome.upvotes, outcome.downvotes), (0, 1));

        // Upvote replaces the downvote
        let outcome = toggle_vote(&mut issue, user, VoteKind::Up);
        assert!(outcome.active);
        assert_eq!((outcome.upvotes, outcome.downvotes), (1, 0));

        // Second upvote toggles off
        let outcome = toggle_vote(&mut issue, user, VoteKind::Up);
        assert!(!outcome.active);
        assert_eq!((outcome.upvotes, outcome.downvotes), (0, 0));
    }

    #[test]
    fn test_transition_apply() {
        let mut issue = IssueDoc::default();
        let transition = IssueTransition {
            severity: Some(Severity::Red),
            assigned_department: Some("Roads".into()),
            ..IssueTransition::to(IssueStatus::Acknowledged)
        };
        issue.apply(&transition);

        assert_eq!(issue.status, IssueStatus::Acknowledged);
        assert!(issue.acknowledged_at.is_some());
        assert!(issue.resolved_at.is_none());
        assert_eq!(issue.severity, Severity::Red);

        let set = transition.to_set_document();
        assert_eq!(set.get_str("status").unwrap(), "Acknowledged");
        assert_eq!(set.get_str("severity").unwrap(), "red");
    }

    #[test]
    fn test_transition_guard_filter() {
        assert_eq!(
            IssueStatus::InProgress.predecessors(),
            vec![IssueStatus::Reported, IssueStatus::Acknowledged, IssueStatus::InProgress]
        );

        let id = ObjectId::new();
        let filter = IssueTransition::to(IssueStatus::Acknowledged).guard_filter(id);
        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        let allowed = filter
            .get_document("status")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(
            allowed,
            &vec![bson::Bson::from("Reported"), bson::Bson::from("Acknowledged")]
        );
    }

    #[test]
    fn test_filter_matches() {
        let issue = IssueDoc {
            category: IssueCategory::Safety,
            ward_number: "12".into(),
            ..IssueDoc::default()
        };
        assert!(IssueFilter::default().matches(&issue));
        assert!(IssueFilter {
            category: Some(IssueCategory::Safety),
            ward_number: Some("12".into()),
            ..IssueFilter::default()
        }
        .matches(&issue));
        assert!(!IssueFilter {
            status: Some(IssueStatus::Resolved),
            ..IssueFilter::default()
        }
        .matches(&issue));
    }
}
