//! Storage seam used by every handler
//!
//! `MongoStore` backs production; `MemoryStore` backs dev mode without a
//! database and the test suite. Both honor the same contract:
//! - listings exclude soft-deleted documents
//! - `list_issues` returns newest first
//! - single-document updates (votes, comments, transitions) are atomic
//! - a transition never moves an issue backwards, even under concurrent writers

use bson::oid::ObjectId;

use crate::auth::Role;
use crate::db::schemas::{
    CommentDoc, CommentThread, IssueDoc, IssueFilter, IssueTransition, TransitionOutcome,
    UpsertSummary, UserDoc, UserPatch, VoteKind, VoteOutcome, WardDoc,
};
use crate::types::Result;

#[async_trait::async_trait]
pub trait CivicStore: Send + Sync {
    /// Short backend name for logs and `/health`
    fn backend(&self) -> &'static str;

    /// Whether the backing database answers
    async fn ping(&self) -> bool;

    // ---- users ----

    /// Insert a user; duplicate email or username is `Conflict`
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc>;

    async fn get_user(&self, id: ObjectId) -> Result<Option<UserDoc>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserDoc>>;

    /// All users, newest first, optionally restricted to one role
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<UserDoc>>;

    /// Users with the given ids; unknown ids are skipped
    async fn get_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>>;

    async fn find_admin(&self) -> Result<Option<UserDoc>>;

    /// Apply a patch, returning the updated user
    async fn update_user(&self, id: ObjectId, patch: &UserPatch) -> Result<Option<UserDoc>>;

    /// Add or remove a follow edge on both users
    async fn set_follow(&self, follower: ObjectId, followee: ObjectId, follow: bool) -> Result<()>;

    // ---- issues ----

    async fn insert_issue(&self, issue: IssueDoc) -> Result<IssueDoc>;

    /// Bulk insert, keeping any creation time already set
    async fn insert_issues(&self, issues: Vec<IssueDoc>) -> Result<usize>;

    async fn get_issue(&self, id: ObjectId) -> Result<Option<IssueDoc>>;

    /// Matching issues, newest first
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueDoc>>;

    /// Toggle a vote; `None` when the issue does not exist
    async fn toggle_vote(
        &self,
        id: ObjectId,
        user: ObjectId,
        kind: VoteKind,
    ) -> Result<Option<VoteOutcome>>;

    /// Append to comments or official replies; false when the issue does not exist
    async fn push_comment(
        &self,
        id: ObjectId,
        comment: CommentDoc,
        thread: CommentThread,
    ) -> Result<bool>;

    /// Apply a status transition unless the issue has already moved past its
    /// target; the status check and the write are one atomic step.
    /// `None` when the issue does not exist.
    async fn apply_transition(
        &self,
        id: ObjectId,
        transition: &IssueTransition,
    ) -> Result<Option<TransitionOutcome>>;

    // ---- wards ----

    async fn find_ward(&self, city: &str, ward: &str, zone: &str) -> Result<Option<WardDoc>>;

    /// Wards of a city ordered by ward then zone
    async fn list_wards(&self, city: &str) -> Result<Vec<WardDoc>>;

    async fn count_wards(&self, city: &str) -> Result<u64>;

    /// Upsert on (city, ward, zone)
    async fn upsert_wards(&self, wards: Vec<WardDoc>) -> Result<UpsertSummary>;
}

/// Ward ordering shared by both stores: numeric when both parse
pub fn compare_ward_keys(a: &WardDoc, b: &WardDoc) -> std::cmp::Ordering {
    fn key(value: &str) -> (Option<u64>, &str) {
        (value.trim().parse::<u64>().ok(), value)
    }
    let by = |x: &str, y: &str| match (key(x), key(y)) {
        ((Some(nx), _), (Some(ny), _)) => nx.cmp(&ny),
        ((_, sx), (_, sy)) => sx.cmp(sy),
    };
    by(&a.ward_number, &b.ward_number).then_with(|| by(&a.zone_number, &b.zone_number))
}
