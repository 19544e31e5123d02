//! Demo issue generation for exercising the feed and map views

use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::db::schemas::{
    GeoLocation, IssueCategory, IssueDoc, IssueStatus, Metadata, Severity, WardDoc,
};

pub const DEFAULT_SEED_COUNT: usize = 150;
pub const MAX_SEED_COUNT: usize = 1000;

/// Jitter around the city centre, in degrees per axis
const JITTER_DEG: f64 = 0.02;

/// Demo issues are spread over the last month
const MAX_AGE_HOURS: i64 = 30 * 24;

/// Clamp a requested count to `1..=1000`
pub fn clamp_seed_count(requested: Option<i64>) -> usize {
    requested
        .unwrap_or(DEFAULT_SEED_COUNT as i64)
        .clamp(1, MAX_SEED_COUNT as i64) as usize
}

/// Build `count` random issues in random wards around `(lat, lng)`.
/// Returns an empty list when there are no wards.
pub fn generate_issues(
    count: usize,
    wards: &[WardDoc],
    city: &str,
    center: (f64, f64),
    reporter: ObjectId,
) -> Vec<IssueDoc> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    (0..count)
        .filter_map(|i| {
            let ward = wards.choose(&mut rng)?;
            let title_category = *IssueCategory::ALL.choose(&mut rng)?;
            let category = *IssueCategory::ALL.choose(&mut rng)?;
            let status = *IssueStatus::ALL.choose(&mut rng)?;
            let severity = *[Severity::Blue, Severity::Yellow, Severity::Red].choose(&mut rng)?;
            let mut jitter = || (rng.gen::<f64>() - 0.5) * JITTER_DEG;
            let location = GeoLocation {
                lat: center.0 + jitter(),
                lng: center.1 + jitter(),
                address: format!(
                    "Ward {}, Zone {}, {}",
                    ward.ward_number, ward.zone_number, city
                ),
            };
            let created = now - Duration::hours(rng.gen_range(0..MAX_AGE_HOURS));

            Some(IssueDoc {
                metadata: Metadata::created_at(created),
                title: format!("Issue #{}: {}", i + 1, title_category),
                description:
                    "Auto-generated demo issue for testing the feed and UI responsiveness."
                        .to_string(),
                category,
                ward_number: ward.ward_number.clone(),
                zone_number: ward.zone_number.clone(),
                location,
                severity,
                status,
                reported_by: reporter,
                ..IssueDoc::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_seed_count() {
        assert_eq!(clamp_seed_count(None), 150);
        assert_eq!(clamp_seed_count(Some(0)), 1);
        assert_eq!(clamp_seed_count(Some(5000)), 1000);
        assert_eq!(clamp_seed_count(Some(42)), 42);
    }

    #[test]
    fn test_generated_issues_stay_near_centre() {
        let wards = vec![
            WardDoc::new("Madurai", "1", "1", None),
            WardDoc::new("Madurai", "2", "1", None),
        ];
        let reporter = ObjectId::new();
        let issues = generate_issues(50, &wards, "Madurai", (9.9252, 78.1198), reporter);

        assert_eq!(issues.len(), 50);
        for issue in &issues {
            assert!((issue.location.lat - 9.9252).abs() <= 0.01);
            assert!((issue.location.lng - 78.1198).abs() <= 0.01);
            assert!(issue.ward_number == "1" || issue.ward_number == "2");
            assert_eq!(issue.reported_by, reporter);
            assert!(issue.metadata.created() <= Utc::now());
        }
        assert!(issues[0].title.starts_with("Issue #1: "));
    }

    #[test]
    fn test_no_wards_no_issues() {
        assert!(generate_issues(10, &[], "Madurai", (0.0, 0.0), ObjectId::new()).is_empty());
    }
}
