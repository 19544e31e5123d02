//! Request-time feed heuristics
//!
//! Pure functions over issue snapshots: urgency, trending and prioritized
//! scores, greedy proximity clustering and the `near` radius filter.

pub mod cluster;
pub mod geo;
pub mod scoring;

pub use cluster::{cluster_issues, Centroid, Cluster, CLUSTER_RADIUS_DEG};
pub use geo::{haversine_m, NearFilter, DEFAULT_NEAR_RADIUS_M};
pub use scoring::{
    category_weight, paginate, prioritized_score, rank_by, severity_weight, trending_score,
    urgency_score, Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
