//! Issue endpoints
//!
//! - `GET /issues` - newest first with optional filters
//! - `GET /issues/clustered` - greedy proximity clusters for the map
//! - `GET /issues/{id}`
//! - `POST /issues` - report an issue in a known ward/zone
//! - `POST /issues/{id}/upvote|downvote|like` - toggle votes
//! - `POST /issues/{id}/comment`
//! - `POST /issues/{id}/acknowledge|progress|resolve|reply` - verified officials

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use hyper::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::require_verified_official;
use crate::db::schemas::{
    CommentDoc, CommentThread, GeoLocation, IssueCategory, IssueDoc, IssueFilter, IssueStatus,
    IssueTransition, Severity, TransitionOutcome, VoteKind,
};
use crate::feed::{cluster_issues, Cluster, NearFilter};
use crate::db::schemas::UserDoc;
use crate::routes::response::{
    authenticate, json_response, parse_id, success, ApiRequest, FullBody,
};
use crate::server::AppState;
use crate::services::views::{referenced_users, Directory};
use crate::services::{comment_view, issue_view, issue_views};
use crate::types::{CivicError, Result};

const ISSUE_NOT_FOUND: &str = "Issue not found";

fn issue_not_found() -> CivicError {
    CivicError::not_found(ISSUE_NOT_FOUND)
}

/// `None` when a category or status value names nothing, so no issue can match
fn parse_filter(req: &ApiRequest) -> Option<IssueFilter> {
    Some(IssueFilter {
        category: req.query("category").map(str::parse).transpose().ok()?,
        status: req.query("status").map(str::parse).transpose().ok()?,
        ward_number: req.query("ward").map(str::to_string),
    })
}

pub async fn handle_list(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let near = req.query("near").map(NearFilter::parse).transpose()?;

    let mut issues = match parse_filter(req) {
        Some(filter) => state.store.list_issues(&filter).await?,
        None => Vec::new(),
    };
    if let Some(near) = near {
        issues.retain(|issue| near.contains(issue));
    }

    let views = issue_views(state.store.as_ref(), &issues, Utc::now()).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "status": "success",
            "results": views.len(),
            "data": { "issues": views },
        }),
    ))
}

pub async fn handle_clustered(state: &AppState) -> Result<Response<FullBody>> {
    let issues = state.store.list_issues(&IssueFilter::default()).await?;
    let now = Utc::now();

    let directory = Directory::load(state.store.as_ref(), referenced_users(&issues)).await?;

    let clusters: Vec<Cluster<_>> = cluster_issues(issues, |issue: &IssueDoc| {
        issue
            .location
            .has_coordinates()
            .then_some((issue.location.lat, issue.location.lng))
    })
    .into_iter()
    .map(|cluster| Cluster {
        centroid: cluster.centroid,
        issues: cluster
            .issues
            .iter()
            .map(|issue| directory.issue(issue, now))
            .collect(),
    })
    .collect();

    success(StatusCode::OK, json!({ "clusters": clusters }))
}

pub async fn handle_get(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let issue = state
        .store
        .get_issue(parse_id(id)?)
        .await?
        .ok_or_else(issue_not_found)?;

    let view = issue_view(state.store.as_ref(), &issue, Utc::now()).await?;
    success(StatusCode::OK, json!({ "issue": view }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub ward_number: String,
    #[serde(default)]
    pub zone_number: String,
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub images: Vec<String>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: String,
}

pub async fn handle_create(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let body: CreateIssueRequest = req.json()?;

    let city = &state.args.city;
    let (ward, zone) = (body.ward_number.trim(), body.zone_number.trim());
    if state.store.find_ward(city, ward, zone).await?.is_none() {
        return Err(CivicError::bad_request(format!(
            "Invalid ward/zone for {}",
            city
        )));
    }

    let title = body.title.trim();
    let description = body.description.trim();
    if title.is_empty() || description.is_empty() || body.category.trim().is_empty() {
        return Err(CivicError::bad_request(
            "Title, description and category are required",
        ));
    }
    let category: IssueCategory = body.category.parse()?;
    let location = body
        .location
        .ok_or_else(|| CivicError::bad_request("Location is required"))?;
    if !location.lat.is_finite() || !location.lng.is_finite() {
        return Err(CivicError::bad_request("Location must have numeric lat and lng"));
    }

    let reporter = user_id(&user)?;
    let issue = state
        .store
        .insert_issue(IssueDoc {
            title: title.to_string(),
            description: description.to_string(),
            category,
            ward_number: ward.to_string(),
            zone_number: zone.to_string(),
            location: GeoLocation {
                lat: location.lat,
                lng: location.lng,
                address: location.address,
            },
            severity: body.severity.unwrap_or_default(),
            images: body.images,
            reported_by: reporter,
            ..IssueDoc::default()
        })
        .await?;
    info!(issue_id = %issue.id_hex(), user_id = %user.id_hex(), "Issue reported: {}", issue.title);

    let view = issue_view(state.store.as_ref(), &issue, Utc::now()).await?;
    success(StatusCode::CREATED, json!({ "issue": view }))
}

fn user_id(user: &UserDoc) -> Result<ObjectId> {
    user._id
        .ok_or_else(|| CivicError::Internal("authenticated user without id".into()))
}

pub async fn handle_vote(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
    kind: VoteKind,
) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let outcome = state
        .store
        .toggle_vote(parse_id(id)?, user_id(&user)?, kind)
        .await?
        .ok_or_else(issue_not_found)?;

    success(
        StatusCode::OK,
        json!({ "upvotes": outcome.upvotes, "downvotes": outcome.downvotes }),
    )
}

/// Older clients "like" instead of upvoting
pub async fn handle_like(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let outcome = state
        .store
        .toggle_vote(parse_id(id)?, user_id(&user)?, VoteKind::Up)
        .await?
        .ok_or_else(issue_not_found)?;

    success(
        StatusCode::OK,
        json!({ "liked": outcome.active, "likesCount": outcome.upvotes }),
    )
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn handle_comment(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let body: TextRequest = req.json()?;
    let text = body.text.trim();
    if text.is_empty() {
        return Err(CivicError::bad_request("Comment text is required"));
    }

    let comment = CommentDoc::new(user_id(&user)?, text.to_string());
    let found = state
        .store
        .push_comment(parse_id(id)?, comment.clone(), CommentThread::Comments)
        .await?;
    if !found {
        return Err(issue_not_found());
    }

    let view = comment_view(state.store.as_ref(), &comment).await?;
    success(StatusCode::CREATED, json!({ "comment": view }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub resolution_eta: Option<String>,
    pub assigned_department: Option<String>,
    pub assigned_official: Option<String>,
    pub severity: Option<Severity>,
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
fn parse_eta(raw: &str) -> Result<bson::DateTime> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(bson::DateTime::from_chrono(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| bson::DateTime::from_chrono(dt.and_utc()))
        .ok_or_else(|| CivicError::bad_request(format!("Invalid resolutionEta: {}", raw)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn handle_transition(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
    status: IssueStatus,
) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    require_verified_official(&user)?;
    let body: TransitionRequest = req.json()?;
    let id = parse_id(id)?;

    let transition = IssueTransition {
        status,
        resolution_eta: body.resolution_eta.as_deref().map(parse_eta).transpose()?,
        assigned_department: non_empty(body.assigned_department),
        assigned_official: non_empty(body.assigned_official),
        severity: body.severity,
    };
    let issue = match state
        .store
        .apply_transition(id, &transition)
        .await?
        .ok_or_else(issue_not_found)?
    {
        TransitionOutcome::Applied(issue) => issue,
        TransitionOutcome::Rejected(current) => {
            return Err(CivicError::bad_request(format!(
                "Cannot move issue from {} to {}",
                current, status
            )))
        }
    };
    info!(issue_id = %issue.id_hex(), official = %user.username, "Issue moved to {}", status);

    let view = issue_view(state.store.as_ref(), &issue, Utc::now()).await?;
    success(StatusCode::OK, json!({ "issue": view }))
}

pub async fn handle_reply(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    require_verified_official(&user)?;
    let body: TextRequest = req.json()?;
    let text = body.text.trim();
    if text.is_empty() {
        return Err(CivicError::bad_request("Reply text is required"));
    }

    let reply = CommentDoc::new(user_id(&user)?, text.to_string());
    let found = state
        .store
        .push_comment(parse_id(id)?, reply.clone(), CommentThread::OfficialReplies)
        .await?;
    if !found {
        return Err(issue_not_found());
    }

    let view = comment_view(state.store.as_ref(), &reply).await?;
    success(StatusCode::CREATED, json!({ "reply": view }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::header::HeaderMap;
    use hyper::Method;
    use std::collections::HashMap;

    fn list_request(query: &[(&str, &str)]) -> ApiRequest {
        ApiRequest {
            addr: "127.0.0.1:9".parse().unwrap(),
            method: Method::GET,
            path: "/issues".into(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter(&list_request(&[
            ("category", "road damage"),
            ("status", "In Progress"),
            ("ward", "12"),
        ]))
        .unwrap();
        assert_eq!(filter.category, Some(IssueCategory::RoadDamage));
        assert_eq!(filter.status, Some(IssueStatus::InProgress));
        assert_eq!(filter.ward_number.as_deref(), Some("12"));

        assert_eq!(parse_filter(&list_request(&[])), Some(IssueFilter::default()));
        assert!(parse_filter(&list_request(&[("category", "Potholes")])).is_none());
        assert!(parse_filter(&list_request(&[("status", "Closed")])).is_none());
    }

    #[test]
    fn test_parse_eta() {
        let at = parse_eta("2026-11-01T10:30:00+05:30").unwrap();
        assert_eq!(at.to_chrono().to_rfc3339(), "2026-11-01T05:00:00+00:00");

        let day = parse_eta("2026-11-02").unwrap();
        assert_eq!(day.to_chrono().to_rfc3339(), "2026-11-02T00:00:00+00:00");

        assert!(parse_eta("next week").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  Roads ".into())), Some("Roads".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
