//! In-memory store for dev mode and tests
//!
//! Each collection is a `DashMap`; mutating a single document holds that
//! entry's shard lock, so votes and comment appends are atomic.

use bson::{oid::ObjectId, DateTime};
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::auth::Role;
use crate::db::schemas::{
    toggle_vote, CommentDoc, CommentThread, IssueDoc, IssueFilter, IssueTransition, Metadata,
    TransitionOutcome, UpsertSummary, UserDoc, UserPatch, VoteKind, VoteOutcome, WardDoc,
};
use crate::db::store::{compare_ward_keys, CivicStore};
use crate::types::{CivicError, Result};

type WardKey = (String, String, String);

fn ward_key(city: &str, ward: &str, zone: &str) -> WardKey {
    (city.to_string(), ward.to_string(), zone.to_string())
}

fn stamp(metadata: &mut Metadata) {
    let now = DateTime::now();
    metadata.is_deleted = false;
    if metadata.created_at.is_none() {
        metadata.created_at = Some(now);
    }
    metadata.updated_at = Some(now);
}

/// Newest first; ObjectIds break ties between documents created in the same millisecond
fn newest_first<T>(docs: &mut [T], key: impl Fn(&T) -> (Option<DateTime>, Option<ObjectId>)) {
    docs.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    issues: DashMap<ObjectId, IssueDoc>,
    wards: DashMap<WardKey, WardDoc>,
    /// Serializes the email/username uniqueness check with the insert
    user_insert: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_users(&self) -> impl Iterator<Item = UserDoc> + '_ {
        self.users
            .iter()
            .filter(|u| !u.metadata.is_deleted)
            .map(|u| u.value().clone())
    }
}

#[async_trait::async_trait]
impl CivicStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let _guard = self
            .user_insert
            .lock()
            .map_err(|_| CivicError::Internal("user insert lock poisoned".into()))?;

        let taken = self
            .live_users()
            .any(|u| u.email == user.email || u.username == user.username);
        if taken {
            return Err(CivicError::Conflict("Duplicate key".into()));
        }

        let id = user._id.unwrap_or_else(ObjectId::new);
        user._id = Some(id);
        stamp(&mut user.metadata);
        self.users.insert(id, user.clone());
        debug!(user_id = %id, "memory: inserted user");
        Ok(user)
    }

    async fn get_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        Ok(self
            .users
            .get(&id)
            .filter(|u| !u.metadata.is_deleted)
            .map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        Ok(self.live_users().find(|u| u.email == email))
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserDoc>> {
        Ok(self
            .live_users()
            .find(|u| u.email == email || u.username == username))
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<UserDoc>> {
        let mut users: Vec<UserDoc> = self
            .live_users()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect();
        newest_first(&mut users, |u| (u.metadata.created_at, u._id));
        Ok(users)
    }

    async fn get_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id))
            .filter(|u| !u.metadata.is_deleted)
            .map(|u| u.value().clone())
            .collect())
    }

    async fn find_admin(&self) -> Result<Option<UserDoc>> {
        Ok(self.live_users().find(|u| u.role == Role::Admin))
    }

    async fn update_user(&self, id: ObjectId, patch: &UserPatch) -> Result<Option<UserDoc>> {
        Ok(self.users.get_mut(&id).map(|mut user| {
            patch.apply(&mut user);
            user.clone()
        }))
    }

    async fn set_follow(&self, follower: ObjectId, followee: ObjectId, follow: bool) -> Result<()> {
        // Entries are updated one at a time so the two shard locks never overlap
        if let Some(mut user) = self.users.get_mut(&follower) {
            user.following.retain(|id| *id != followee);
            if follow {
                user.following.push(followee);
            }
            user.metadata.touch();
        }
        if let Some(mut user) = self.users.get_mut(&followee) {
            user.followers.retain(|id| *id != follower);
            if follow {
                user.followers.push(follower);
            }
            user.metadata.touch();
        }
        Ok(())
    }

    async fn insert_issue(&self, mut issue: IssueDoc) -> Result<IssueDoc> {
        let id = issue._id.unwrap_or_else(ObjectId::new);
        issue._id = Some(id);
        stamp(&mut issue.metadata);
        self.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn insert_issues(&self, issues: Vec<IssueDoc>) -> Result<usize> {
        let count = issues.len();
        for issue in issues {
            self.insert_issue(issue).await?;
        }
        Ok(count)
    }

    async fn get_issue(&self, id: ObjectId) -> Result<Option<IssueDoc>> {
        Ok(self
            .issues
            .get(&id)
            .filter(|i| !i.metadata.is_deleted)
            .map(|i| i.value().clone()))
    }

    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueDoc>> {
        let mut issues: Vec<IssueDoc> = self
            .issues
            .iter()
            .filter(|i| !i.metadata.is_deleted && filter.matches(i.value()))
            .map(|i| i.value().clone())
            .collect();
        newest_first(&mut issues, |i| (i.metadata.created_at, i._id));
        Ok(issues)
    }

    async fn toggle_vote(
        &self,
        id: ObjectId,
        user: ObjectId,
        kind: VoteKind,
    ) -> Result<Option<VoteOutcome>> {
        Ok(self
            .issues
            .get_mut(&id)
            .filter(|i| !i.metadata.is_deleted)
            .map(|mut issue| toggle_vote(&mut issue, user, kind)))
    }

    async fn push_comment(
        &self,
        id: ObjectId,
        comment: CommentDoc,
        thread: CommentThread,
    ) -> Result<bool> {
        let Some(mut issue) = self.issues.get_mut(&id) else {
            return Ok(false);
        };
        if issue.metadata.is_deleted {
            return Ok(false);
        }
        match thread {
            CommentThread::Comments => issue.comments.push(comment),
            CommentThread::OfficialReplies => issue.official_replies.push(comment),
        }
        issue.metadata.touch();
        Ok(true)
    }

    async fn apply_transition(
        &self,
        id: ObjectId,
        transition: &IssueTransition,
    ) -> Result<Option<TransitionOutcome>> {
        Ok(self
            .issues
            .get_mut(&id)
            .filter(|i| !i.metadata.is_deleted)
            .map(|mut issue| {
                // Checked under the entry lock
                if !issue.status.can_advance_to(transition.status) {
                    return TransitionOutcome::Rejected(issue.status);
                }
                issue.apply(transition);
                TransitionOutcome::Applied(issue.clone())
            }))
    }

    async fn find_ward(&self, city: &str, ward: &str, zone: &str) -> Result<Option<WardDoc>> {
        Ok(self
            .wards
            .get(&ward_key(city, ward, zone))
            .filter(|w| !w.metadata.is_deleted)
            .map(|w| w.value().clone()))
    }

    async fn list_wards(&self, city: &str) -> Result<Vec<WardDoc>> {
        let mut wards: Vec<WardDoc> = self
            .wards
            .iter()
            .filter(|w| w.city == city && !w.metadata.is_deleted)
            .map(|w| w.value().clone())
            .collect();
        wards.sort_by(compare_ward_keys);
        Ok(wards)
    }

    async fn count_wards(&self, city: &str) -> Result<u64> {
        Ok(self
            .wards
            .iter()
            .filter(|w| w.city == city && !w.metadata.is_deleted)
            .count() as u64)
    }

    async fn upsert_wards(&self, wards: Vec<WardDoc>) -> Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for mut ward in wards {
            let key = ward_key(&ward.city, &ward.ward_number, &ward.zone_number);
            if let Some(mut existing) = self.wards.get_mut(&key) {
                if existing.name != ward.name {
                    existing.name = ward.name;
                    existing.metadata.touch();
                    summary.modified += 1;
                }
                continue;
            }
            ward._id = Some(ward._id.unwrap_or_else(ObjectId::new));
            stamp(&mut ward.metadata);
            self.wards.insert(key, ward);
            summary.upserted += 1;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(username: &str, email: &str) -> UserDoc {
        UserDoc::new(username.into(), email.into(), username.into(), "hash".into())
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = MemoryStore::new();
        store.insert_user(user("asha", "asha@example.com")).await.unwrap();

        let dup_email = store.insert_user(user("other", "asha@example.com")).await;
        assert!(matches!(dup_email, Err(CivicError::Conflict(_))));

        let dup_name = store.insert_user(user("asha", "new@example.com")).await;
        assert!(matches!(dup_name, Err(CivicError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_issues_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (title, hours) in [("old", 48), ("new", 1), ("mid", 10)] {
            store
                .insert_issue(IssueDoc {
                    title: title.into(),
                    metadata: Metadata::created_at(now - Duration::hours(hours)),
                    ..IssueDoc::default()
                })
                .await
                .unwrap();
        }

        let titles: Vec<String> = store
            .list_issues(&IssueFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_vote_on_missing_issue() {
        let store = MemoryStore::new();
        let outcome = store
            .toggle_vote(ObjectId::new(), ObjectId::new(), VoteKind::Up)
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_transition_never_regresses() {
        use crate::db::schemas::IssueStatus;

        let store = MemoryStore::new();
        let issue = store.insert_issue(IssueDoc::default()).await.unwrap();
        let id = issue._id.unwrap();

        let resolved = store
            .apply_transition(id, &IssueTransition::to(IssueStatus::Resolved))
            .await
            .unwrap();
        assert!(matches!(resolved, Some(TransitionOutcome::Applied(ref i)) if i.status == IssueStatus::Resolved));
        let before = store.get_issue(id).await.unwrap().unwrap();

        let regress = IssueTransition {
            assigned_department: Some("Roads".into()),
            ..IssueTransition::to(IssueStatus::InProgress)
        };
        let outcome = store.apply_transition(id, &regress).await.unwrap();
        assert!(matches!(outcome, Some(TransitionOutcome::Rejected(IssueStatus::Resolved))));

        let after = store.get_issue(id).await.unwrap().unwrap();
        assert_eq!(after.status, IssueStatus::Resolved);
        assert_eq!(after.assigned_department, None);
        assert_eq!(after.resolved_at, before.resolved_at);
        assert_eq!(after.metadata.updated_at, before.metadata.updated_at);

        let missing = store
            .apply_transition(ObjectId::new(), &IssueTransition::to(IssueStatus::Resolved))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_transitions_stay_forward() {
        use crate::db::schemas::IssueStatus;
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let issue = store.insert_issue(IssueDoc::default()).await.unwrap();
        let id = issue._id.unwrap();

        let handles: Vec<_> = [IssueStatus::Resolved, IssueStatus::InProgress, IssueStatus::Acknowledged]
            .into_iter()
            .map(|status| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.apply_transition(id, &IssueTransition::to(status)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Whatever the interleaving, Resolved is terminal
        let issue = store.get_issue(id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Resolved);
        assert!(issue.resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_follow_edges() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("a", "a@example.com")).await.unwrap();
        let b = store.insert_user(user("b", "b@example.com")).await.unwrap();
        let (a_id, b_id) = (a._id.unwrap(), b._id.unwrap());

        store.set_follow(a_id, b_id, true).await.unwrap();
        store.set_follow(a_id, b_id, true).await.unwrap();
        assert_eq!(store.get_user(a_id).await.unwrap().unwrap().following, vec![b_id]);
        assert_eq!(store.get_user(b_id).await.unwrap().unwrap().followers, vec![a_id]);

        store.set_follow(a_id, b_id, false).await.unwrap();
        assert!(store.get_user(b_id).await.unwrap().unwrap().followers.is_empty());
    }

    #[tokio::test]
    async fn test_ward_upsert_counts() {
        let store = MemoryStore::new();
        let wards = vec![
            WardDoc::new("Madurai", "10", "2", None),
            WardDoc::new("Madurai", "2", "1", Some("Anna Nagar".into())),
        ];
        let summary = store.upsert_wards(wards.clone()).await.unwrap();
        assert_eq!(summary, UpsertSummary { upserted: 2, modified: 0 });

        let mut renamed = wards;
        renamed[0].name = Some("Teppakulam".into());
        let summary = store.upsert_wards(renamed).await.unwrap();
        assert_eq!(summary, UpsertSummary { upserted: 0, modified: 1 });

        let listed = store.list_wards("Madurai").await.unwrap();
        assert_eq!(listed[0].ward_number, "2");
        assert_eq!(store.count_wards("Chennai").await.unwrap(), 0);
    }
}
