//! Admin endpoints
//!
//! - `GET /admin/users?role=` - list users
//! - `POST /admin/users/{id}/verify` - verify an official
//! - `POST /admin/users/{id}/role` - change role, department or verification
//! - `POST /admin/bootstrap` - create the first admin (open until one exists)
//! - `POST /admin/issues/seed` - generate demo issues
//! - `POST /admin/wards/seed` - load wards from the seed CSV
//!
//! Everything except bootstrap requires the admin role.

use hyper::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{require_admin, Role};
use crate::db::schemas::{UserDoc, UserPatch};
use crate::routes::auth_routes::{auth_response, create_account, normalize_email};
use crate::routes::response::{authenticate, parse_id, success, ApiRequest, FullBody};
use crate::server::AppState;
use crate::services::demo::{clamp_seed_count, generate_issues};
use crate::services::{seed_wards_from_file, UserView};
use crate::types::{CivicError, Result};

async fn admin_user(state: &AppState, req: &ApiRequest) -> Result<UserDoc> {
    let user = authenticate(state, req).await?;
    if let Err(e) = require_admin(&user) {
        warn!("[{}] {} attempted {} {}", req.addr, user.username, req.method, req.path);
        return Err(e);
    }
    Ok(user)
}

fn user_not_found() -> CivicError {
    CivicError::not_found("User not found")
}

fn parse_role(raw: Option<&str>) -> Result<Option<Role>> {
    raw.map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::parse)
        .transpose()
}

pub async fn handle_list_users(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    admin_user(state, req).await?;
    let role = parse_role(req.query("role"))?;

    let users: Vec<UserView> = state
        .store
        .list_users(role)
        .await?
        .iter()
        .map(UserView::from)
        .collect();
    success(StatusCode::OK, json!({ "users": users }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub role: Option<String>,
    pub department: Option<String>,
    pub is_verified: Option<bool>,
}

fn department(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

async fn apply_patch(
    state: &AppState,
    admin: &UserDoc,
    id: &str,
    patch: UserPatch,
) -> Result<Response<FullBody>> {
    let id = parse_id(id)?;
    if patch.is_empty() {
        let user = state.store.get_user(id).await?.ok_or_else(user_not_found)?;
        return success(StatusCode::OK, json!({ "user": UserView::from(&user) }));
    }

    let user = state
        .store
        .update_user(id, &patch)
        .await?
        .ok_or_else(user_not_found)?;
    info!(
        admin = %admin.username,
        user_id = %user.id_hex(),
        role = %user.role,
        verified = user.is_verified,
        "User updated by admin"
    );
    success(StatusCode::OK, json!({ "user": UserView::from(&user) }))
}

pub async fn handle_verify(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
) -> Result<Response<FullBody>> {
    let admin = admin_user(state, req).await?;
    let body: RoleRequest = req.json()?;

    let patch = UserPatch {
        is_verified: Some(true),
        role: Some(parse_role(body.role.as_deref())?.unwrap_or(Role::Official)),
        department: department(body.department),
        ..UserPatch::default()
    };
    apply_patch(state, &admin, id, patch).await
}

pub async fn handle_set_role(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
) -> Result<Response<FullBody>> {
    let admin = admin_user(state, req).await?;
    let body: RoleRequest = req.json()?;

    let patch = UserPatch {
        role: parse_role(body.role.as_deref())?,
        department: department(body.department),
        is_verified: body.is_verified,
        ..UserPatch::default()
    };
    apply_patch(state, &admin, id, patch).await
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_admin_password() -> String {
    "Admin123".to_string()
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

pub async fn handle_bootstrap(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    if state.store.find_admin().await?.is_some() {
        return Err(CivicError::bad_request("Admin already exists"));
    }
    let body: BootstrapRequest = req.json()?;

    let mut admin = UserDoc::new(
        body.username.trim().to_string(),
        normalize_email(&body.email),
        body.name.trim().to_string(),
        String::new(),
    );
    admin.role = Role::Admin;
    admin.is_verified = true;

    let admin = create_account(state, admin, &body.password).await?;
    warn!("Bootstrapped admin account {}", admin.username);

    auth_response(state, StatusCode::OK, &admin)
}

/// `count` may arrive as a number or a numeric string
fn requested_count(body: &Value) -> Option<i64> {
    match body.get("count")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn handle_seed_issues(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let admin = admin_user(state, req).await?;
    let body: Value = req.json()?;
    let count = clamp_seed_count(requested_count(&body));

    let wards = state.store.list_wards(&state.args.city).await?;
    if wards.is_empty() {
        return Err(CivicError::bad_request("No wards to seed against"));
    }

    let reporter = admin
        ._id
        .ok_or_else(|| CivicError::Internal("authenticated user without id".into()))?;
    let issues = generate_issues(
        count,
        &wards,
        &state.args.city,
        (state.args.city_center_lat, state.args.city_center_lng),
        reporter,
    );
    let inserted = state.store.insert_issues(issues).await?;
    info!(admin = %admin.username, "Seeded {} demo issues", inserted);

    success(StatusCode::OK, json!({ "inserted": inserted }))
}

pub async fn handle_seed_wards(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    admin_user(state, req).await?;
    let summary = seed_wards_from_file(state.store.as_ref(), &state.args).await?;

    success(
        StatusCode::OK,
        json!({ "upserted": summary.upserted, "modified": summary.modified }),
    )
}
