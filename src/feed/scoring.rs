//! Urgency, trending and prioritized scores
//!
//! All scores are computed against a caller-supplied `now` so handlers
//! use one clock reading per request.

use chrono::{DateTime, Utc};

use crate::db::schemas::{IssueCategory, IssueDoc, Severity};

pub const DEFAULT_PAGE_LIMIT: usize = 12;
pub const MAX_PAGE_LIMIT: usize = 24;

/// Multiplier applied to the urgency score
pub fn category_weight(category: IssueCategory) -> f64 {
    match category {
        IssueCategory::WaterLogging => 1.5,
        IssueCategory::StrayDogs => 1.2,
        IssueCategory::RoadDamage => 1.3,
        IssueCategory::NoStreetLights => 1.4,
        IssueCategory::UncementedRoad => 1.1,
        _ => 1.0,
    }
}

pub fn severity_weight(severity: Severity) -> i64 {
    match severity {
        Severity::Red => 3,
        Severity::Yellow => 2,
        Severity::Blue => 1,
    }
}

fn age_hours(issue: &IssueDoc, now: DateTime<Utc>) -> f64 {
    let millis = (now - issue.metadata.created()).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

/// Whole days since creation
fn age_days(issue: &IssueDoc, now: DateTime<Utc>) -> i64 {
    (now - issue.metadata.created()).num_days().max(0)
}

/// `(net * 0.3 + comments * 0.5 + min(age_h / 24, 1)) * weight`
pub fn urgency_score(issue: &IssueDoc, now: DateTime<Utc>) -> f64 {
    let net = issue.net_votes() as f64;
    let comments = issue.comments.len() as f64;
    let recency = (age_hours(issue, now) / 24.0).min(1.0);
    (net * 0.3 + comments * 0.5 + recency) * category_weight(issue.category)
}

/// `net + max(0, 10 - age_days)`
pub fn trending_score(issue: &IssueDoc, now: DateTime<Utc>) -> i64 {
    issue.net_votes() + (10 - age_days(issue, now)).max(0)
}

/// Department relevance, popularity, severity and freshness for an official's queue
pub fn prioritized_score(issue: &IssueDoc, department: Option<&str>, now: DateTime<Utc>) -> i64 {
    let relevant = department
        .filter(|d| !d.is_empty())
        .map_or(false, |d| {
            issue.assigned_department.as_deref() == Some(d)
                || issue
                    .category
                    .as_str()
                    .to_lowercase()
                    .contains(&d.to_lowercase())
        });

    (if relevant { 10 } else { 0 })
        + 2 * issue.net_votes()
        + 3 * severity_weight(issue.severity)
        + (30 - age_days(issue, now)).max(0)
}

/// Sort descending by score; equal scores keep their input order
pub fn rank_by<T, S, F>(items: Vec<T>, score: F) -> Vec<T>
where
    S: PartialOrd,
    F: Fn(&T) -> S,
{
    let mut scored: Vec<(S, T)> = items.into_iter().map(|item| (score(&item), item)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, item)| item).collect()
}

/// Trending page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.skip().min(items.len());
        let end = start.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }
}

/// `page` is at least 1; `limit` is clamped to `1..=24`. Unparseable values use the defaults.
pub fn paginate(page: Option<&str>, limit: Option<&str>) -> Page {
    let page = page
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1) as usize;
    let limit = limit
        .and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT as i64)
        .clamp(1, MAX_PAGE_LIMIT as i64) as usize;
    Page { page, limit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;
    use bson::oid::ObjectId;
    use chrono::Duration;

    fn issue_aged(now: DateTime<Utc>, age: Duration) -> IssueDoc {
        IssueDoc {
            metadata: Metadata::created_at(now - age),
            ..IssueDoc::default()
        }
    }

    fn votes(n: usize) -> Vec<ObjectId> {
        (0..n).map(|_| ObjectId::new()).collect()
    }

    #[test]
    fn test_urgency_score() {
        let now = Utc::now();
        let mut issue = issue_aged(now, Duration::hours(12));
        issue.category = IssueCategory::WaterLogging;
        issue.upvotes = votes(4);
        issue.downvotes = votes(2);

        // (2 * 0.3 + 0 + 0.5) * 1.5
        let score = urgency_score(&issue, now);
        assert!((score - 1.65).abs() < 1e-6, "got {score}");

        // Recency saturates after a day
        issue.metadata = Metadata::created_at(now - Duration::days(5));
        issue.category = IssueCategory::Safety;
        let score = urgency_score(&issue, now);
        assert!((score - 1.6).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn test_trending_score() {
        let now = Utc::now();
        let mut fresh = issue_aged(now, Duration::hours(3));
        fresh.upvotes = votes(1);
        assert_eq!(trending_score(&fresh, now), 11);

        let mut stale = issue_aged(now, Duration::days(40));
        stale.downvotes = votes(2);
        assert_eq!(trending_score(&stale, now), -2);

        // Partial days are floored
        let day_and_half = issue_aged(now, Duration::hours(36));
        assert_eq!(trending_score(&day_and_half, now), 9);
    }

    #[test]
    fn test_prioritized_relevance() {
        let now = Utc::now();
        let mut issue = issue_aged(now, Duration::days(40));
        issue.category = IssueCategory::Sanitation;
        issue.severity = Severity::Red;

        assert_eq!(prioritized_score(&issue, None, now), 9);
        assert_eq!(prioritized_score(&issue, Some("sanitation"), now), 19);
        assert_eq!(prioritized_score(&issue, Some("Roads"), now), 9);

        issue.assigned_department = Some("Roads".into());
        assert_eq!(prioritized_score(&issue, Some("Roads"), now), 19);
        assert_eq!(prioritized_score(&issue, Some(""), now), 9);
    }

    #[test]
    fn test_rank_is_stable() {
        let ranked = rank_by(vec![("a", 1), ("b", 3), ("c", 1), ("d", 3)], |(_, s)| *s);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_paginate_clamps() {
        assert_eq!(paginate(None, None), Page { page: 1, limit: 12 });
        assert_eq!(paginate(Some("0"), Some("100")), Page { page: 1, limit: 24 });
        assert_eq!(paginate(Some("3"), Some("-5")), Page { page: 3, limit: 1 });
        assert_eq!(paginate(Some("x"), Some("y")), Page { page: 1, limit: 12 });

        let items: Vec<u32> = (0..30).collect();
        let page = paginate(Some("3"), Some("12"));
        assert_eq!(page.slice(&items), &items[24..30]);
        assert!(paginate(Some("9"), None).slice(&items).is_empty());
    }
}
