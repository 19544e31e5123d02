//! MongoDB-backed store
//!
//! Vote, comment and transition updates are single-document operators
//! (`$addToSet`, `$pull`, `$push`, `$set`), so concurrent writers to the
//! same issue never overwrite each other's changes. Transitions filter on
//! the allowed previous statuses, so a late writer cannot move an issue back.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use tracing::{debug, info};

use crate::auth::Role;
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    CommentDoc, CommentThread, IssueDoc, IssueFilter, IssueTransition, Metadata,
    TransitionOutcome, UpsertSummary, UserDoc, UserPatch, VoteKind, VoteOutcome, WardDoc,
    ISSUE_COLLECTION, USER_COLLECTION, WARD_COLLECTION,
};
use crate::db::store::{compare_ward_keys, CivicStore};
use crate::types::Result;

pub struct MongoStore {
    mongo: MongoClient,
    users: MongoCollection<UserDoc>,
    issues: MongoCollection<IssueDoc>,
    wards: MongoCollection<WardDoc>,
}

fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

fn newest_first() -> Document {
    doc! { "metadata.created_at": -1, "_id": -1 }
}

/// Assign id and creation time locally so the caller gets the stored document back
fn prepare(id: &mut Option<ObjectId>, metadata: &mut Metadata) {
    if id.is_none() {
        *id = Some(ObjectId::new());
    }
    if metadata.created_at.is_none() {
        *metadata = Metadata::new();
    }
}

impl MongoStore {
    /// Connect and open the collections, creating their indexes
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let mongo = MongoClient::new(uri, db_name).await?;
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let issues = mongo.collection::<IssueDoc>(ISSUE_COLLECTION).await?;
        let wards = mongo.collection::<WardDoc>(WARD_COLLECTION).await?;
        info!("MongoDB collections ready in '{}'", mongo.db_name());

        Ok(Self {
            mongo,
            users,
            issues,
            wards,
        })
    }
}

#[async_trait::async_trait]
impl CivicStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> bool {
        self.mongo.ping().await.is_ok()
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        prepare(&mut user._id, &mut user.metadata);
        self.users.insert_one(user.clone()).await?;
        Ok(user)
    }

    async fn get_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(by_id(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserDoc>> {
        self.users
            .find_one(doc! { "$or": [ { "email": email }, { "username": username } ] })
            .await
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<UserDoc>> {
        let filter = match role {
            Some(role) => doc! { "role": role.as_str() },
            None => Document::new(),
        };
        self.users.find_sorted(filter, Some(newest_first())).await
    }

    async fn get_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.users
            .find_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await
    }

    async fn find_admin(&self) -> Result<Option<UserDoc>> {
        self.users
            .find_one(doc! { "role": Role::Admin.as_str() })
            .await
    }

    async fn update_user(&self, id: ObjectId, patch: &UserPatch) -> Result<Option<UserDoc>> {
        self.users
            .find_one_and_update(by_id(id), doc! { "$set": patch.to_set_document() })
            .await
    }

    async fn set_follow(&self, follower: ObjectId, followee: ObjectId, follow: bool) -> Result<()> {
        let op = if follow { "$addToSet" } else { "$pull" };
        let now = DateTime::now();

        self.users
            .update_one(
                by_id(follower),
                doc! { op: { "following": followee }, "$set": { "metadata.updated_at": now } },
            )
            .await?;
        self.users
            .update_one(
                by_id(followee),
                doc! { op: { "followers": follower }, "$set": { "metadata.updated_at": now } },
            )
            .await?;
        Ok(())
    }

    async fn insert_issue(&self, mut issue: IssueDoc) -> Result<IssueDoc> {
        prepare(&mut issue._id, &mut issue.metadata);
        self.issues.insert_one(issue.clone()).await?;
        Ok(issue)
    }

    async fn insert_issues(&self, issues: Vec<IssueDoc>) -> Result<usize> {
        self.issues.insert_many(issues).await
    }

    async fn get_issue(&self, id: ObjectId) -> Result<Option<IssueDoc>> {
        self.issues.find_one(by_id(id)).await
    }

    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueDoc>> {
        self.issues
            .find_sorted(filter.to_document(), Some(newest_first()))
            .await
    }

    async fn toggle_vote(
        &self,
        id: ObjectId,
        user: ObjectId,
        kind: VoteKind,
    ) -> Result<Option<VoteOutcome>> {
        let (target, opposite) = kind.fields();
        let now = DateTime::now();

        // Already voted this way: remove the vote
        let mut filter = by_id(id);
        filter.insert(target, user);
        let removed = self
            .issues
            .find_one_and_update(
                filter,
                doc! { "$pull": { target: user }, "$set": { "metadata.updated_at": now } },
            )
            .await?;
        if let Some(issue) = removed {
            return Ok(Some(VoteOutcome {
                active: false,
                upvotes: issue.upvotes.len(),
                downvotes: issue.downvotes.len(),
            }));
        }

        let added = self
            .issues
            .find_one_and_update(
                by_id(id),
                doc! {
                    "$addToSet": { target: user },
                    "$pull": { opposite: user },
                    "$set": { "metadata.updated_at": now },
                },
            )
            .await?;
        Ok(added.map(|issue| VoteOutcome {
            active: true,
            upvotes: issue.upvotes.len(),
            downvotes: issue.downvotes.len(),
        }))
    }

    async fn push_comment(
        &self,
        id: ObjectId,
        comment: CommentDoc,
        thread: CommentThread,
    ) -> Result<bool> {
        let comment = bson::to_bson(&comment)?;
        let result = self
            .issues
            .update_one(
                by_id(id),
                doc! {
                    "$push": { thread.field(): comment },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn apply_transition(
        &self,
        id: ObjectId,
        transition: &IssueTransition,
    ) -> Result<Option<TransitionOutcome>> {
        let updated = self
            .issues
            .find_one_and_update(
                transition.guard_filter(id),
                doc! { "$set": transition.to_set_document() },
            )
            .await?;
        if let Some(issue) = updated {
            return Ok(Some(TransitionOutcome::Applied(issue)));
        }

        // No match: either the issue is gone or its status is past the target
        Ok(self
            .get_issue(id)
            .await?
            .map(|current| TransitionOutcome::Rejected(current.status)))
    }

    async fn find_ward(&self, city: &str, ward: &str, zone: &str) -> Result<Option<WardDoc>> {
        self.wards
            .find_one(doc! { "city": city, "ward_number": ward, "zone_number": zone })
            .await
    }

    async fn list_wards(&self, city: &str) -> Result<Vec<WardDoc>> {
        let mut wards = self.wards.find_many(doc! { "city": city }).await?;
        wards.sort_by(compare_ward_keys);
        Ok(wards)
    }

    async fn count_wards(&self, city: &str) -> Result<u64> {
        self.wards.count(doc! { "city": city }).await
    }

    async fn upsert_wards(&self, wards: Vec<WardDoc>) -> Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for ward in wards {
            let now = DateTime::now();
            let mut update = doc! {
                "$setOnInsert": {
                    "metadata.created_at": now,
                    "metadata.updated_at": now,
                    "metadata.is_deleted": false,
                },
            };
            // Only a changed name counts as a modification
            match ward.name {
                Some(ref name) => {
                    update.insert("$set", doc! { "name": name });
                }
                None => {
                    update.insert("$unset", doc! { "name": Bson::String(String::new()) });
                }
            }

            let result = self.wards.upsert_one(ward.key_filter(), update).await?;
            if result.upserted_id.is_some() {
                summary.upserted += 1;
            } else {
                summary.modified += result.modified_count;
            }
        }
        debug!(
            upserted = summary.upserted,
            modified = summary.modified,
            "ward upsert finished"
        );
        Ok(summary)
    }
}
