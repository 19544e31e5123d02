//! Greedy proximity clustering for the map view

use serde::Serialize;

/// Euclidean join threshold in degrees (~1 km)
pub const CLUSTER_RADIUS_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster<T> {
    pub centroid: Centroid,
    pub issues: Vec<T>,
}

/// Single greedy pass: each item joins the first cluster whose centroid is
/// strictly within [`CLUSTER_RADIUS_DEG`], otherwise it seeds a new cluster.
/// Centroids stay where their first member put them. Items for which
/// `locate` returns `None` are skipped.
pub fn cluster_issues<T, F>(items: Vec<T>, locate: F) -> Vec<Cluster<T>>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    let mut clusters: Vec<Cluster<T>> = Vec::new();

    for item in items {
        let Some((lat, lng)) = locate(&item) else {
            continue;
        };
        let nearby = clusters.iter_mut().find(|c| {
            let (d_lat, d_lng) = (lat - c.centroid.lat, lng - c.centroid.lng);
            (d_lat * d_lat + d_lng * d_lng).sqrt() < CLUSTER_RADIUS_DEG
        });
        match nearby {
            Some(cluster) => cluster.issues.push(item),
            None => clusters.push(Cluster {
                centroid: Centroid { lat, lng },
                issues: vec![item],
            }),
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(p: &(&str, f64, f64)) -> Option<(f64, f64)> {
        let (_, lat, lng) = *p;
        (lat != 0.0 && lng != 0.0).then_some((lat, lng))
    }

    #[test]
    fn test_groups_within_threshold() {
        let points = vec![("a", 9.9252, 78.1198), ("b", 9.9282, 78.1228)];
        let clusters = cluster_issues(points, locate);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].issues.len(), 2);
        assert_eq!(clusters[0].centroid, Centroid { lat: 9.9252, lng: 78.1198 });
    }

    #[test]
    fn test_separates_beyond_threshold() {
        let points = vec![("a", 9.9252, 78.1198), ("b", 9.9452, 78.1198)];
        let clusters = cluster_issues(points, locate);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_centroid_is_fixed() {
        // c is near b but beyond a's fixed centroid
        let points = vec![
            ("a", 10.0, 78.0),
            ("b", 10.008, 78.0),
            ("c", 10.016, 78.0),
        ];
        let clusters = cluster_issues(points, locate);
        assert_eq!(clusters.len(), 2);
        let names: Vec<&str> = clusters[0].issues.iter().map(|p| p.0).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(clusters[1].centroid.lat, 10.016);
    }

    #[test]
    fn test_skips_missing_coordinates() {
        let points = vec![("a", 0.0, 78.1), ("b", 9.9, 0.0)];
        assert!(cluster_issues(points, locate).is_empty());
    }
}
