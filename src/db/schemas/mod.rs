//! Database schemas for civicconnect
//!
//! Defines MongoDB document structures for users, issues and wards.

mod issue;
mod metadata;
mod user;
mod ward;

pub use issue::{
    toggle_vote, CommentDoc, CommentThread, GeoLocation, IssueCategory, IssueDoc, IssueFilter,
    IssueStatus, IssueTransition, Severity, TransitionOutcome, VoteKind, VoteOutcome,
    ISSUE_COLLECTION,
};
pub use metadata::Metadata;
pub use user::{UserDoc, UserPatch, USER_COLLECTION};
pub use ward::{UpsertSummary, WardDoc, WARD_COLLECTION};
