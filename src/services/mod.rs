//! Services shared by the route handlers

pub mod demo;
pub mod views;
pub mod ward_seed;

pub use views::{
    comment_view, issue_view, issue_views, profile_view, Directory, IssueView, UserRef,
    UserSummary, UserView, WardView,
};
pub use ward_seed::{auto_seed_wards, parse_ward_csv, seed_wards_from_file};
