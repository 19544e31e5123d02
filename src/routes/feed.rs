//! Feed endpoints
//!
//! - `GET /feed/trending?page=&limit=` - net votes plus a ten day freshness bonus
//! - `GET /feed/prioritized` - the caller's department first, then popularity,
//!   severity and a thirty day freshness bonus

use chrono::Utc;
use hyper::{Response, StatusCode};
use serde_json::json;

use crate::db::schemas::IssueFilter;
use crate::feed::{paginate, prioritized_score, rank_by, trending_score};
use crate::routes::response::{authenticate, success, ApiRequest, FullBody};
use crate::server::AppState;
use crate::services::issue_views;
use crate::types::Result;

pub async fn handle_trending(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let page = paginate(req.query("page"), req.query("limit"));
    let now = Utc::now();

    let issues = state.store.list_issues(&IssueFilter::default()).await?;
    let total = issues.len();
    let ranked = rank_by(issues, |issue| trending_score(issue, now));

    let views = issue_views(state.store.as_ref(), page.slice(&ranked), now).await?;
    success(
        StatusCode::OK,
        json!({
            "issues": views,
            "page": page.page,
            "limit": page.limit,
            "total": total,
        }),
    )
}

pub async fn handle_prioritized(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let department = user.department.as_deref();
    let now = Utc::now();

    let issues = state.store.list_issues(&IssueFilter::default()).await?;
    let ranked = rank_by(issues, |issue| prioritized_score(issue, department, now));

    let views = issue_views(state.store.as_ref(), &ranked, now).await?;
    success(StatusCode::OK, json!({ "issues": views }))
}
