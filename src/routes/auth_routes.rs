//! Authentication endpoints
//!
//! - `POST /auth/register` - create a citizen account and return a token
//! - `POST /auth/login` - exchange email and password for a token
//! - `GET /auth/logout` - tokens are stateless; the client drops its copy
//! - `GET /auth/me` - the authenticated user

use hyper::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{check_password_policy, hash_password, verify_password, TokenInput};
use crate::db::schemas::UserDoc;
use crate::routes::response::{
    authenticate, json_response, success, success_message, ApiRequest, FullBody,
};
use crate::server::AppState;
use crate::services::UserView;
use crate::types::{CivicError, Result};

const DUPLICATE_USER: &str = "User with this email or username already exists";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Token plus user, as returned by register, login and admin bootstrap
pub fn auth_response(state: &AppState, status: StatusCode, user: &UserDoc) -> Result<Response<FullBody>> {
    let token = state.jwt.generate_token(TokenInput {
        user_id: user.id_hex(),
        role: user.role,
    })?;

    Ok(json_response(
        status,
        &json!({
            "status": "success",
            "token": token,
            "data": { "user": UserView::from(user) },
        }),
    ))
}

/// Hash the password and insert a new account; duplicates are rejected
pub async fn create_account(state: &AppState, mut user: UserDoc, password: &str) -> Result<UserDoc> {
    check_password_policy(password)?;

    if state
        .store
        .find_user_by_email_or_username(&user.email, &user.username)
        .await?
        .is_some()
    {
        return Err(CivicError::bad_request(DUPLICATE_USER));
    }

    user.password_hash = hash_password(password)?;
    state.store.insert_user(user).await.map_err(|e| match e {
        // Lost a race with a concurrent registration
        CivicError::Conflict(_) => CivicError::bad_request(DUPLICATE_USER),
        other => other,
    })
}

pub async fn handle_register(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let body: RegisterRequest = req.json()?;

    let username = body.username.trim().to_string();
    let email = normalize_email(&body.email);
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(CivicError::bad_request(
            "Please provide username, email and password",
        ));
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| username.clone());

    let user = create_account(
        state,
        UserDoc::new(username, email, name, String::new()),
        &body.password,
    )
    .await?;
    info!(user_id = %user.id_hex(), "Registered user {}", user.username);

    auth_response(state, StatusCode::CREATED, &user)
}

pub async fn handle_login(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let body: LoginRequest = req.json()?;
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(CivicError::bad_request("Please provide email and password"));
    }

    let incorrect = || CivicError::Unauthorized("Incorrect email or password".into());
    let user = state
        .store
        .find_user_by_email(&normalize_email(&body.email))
        .await?
        .ok_or_else(incorrect)?;

    if !verify_password(&body.password, &user.password_hash)? {
        warn!("[{}] failed login for {}", req.addr, user.email);
        return Err(incorrect());
    }

    info!(user_id = %user.id_hex(), "Login for {}", user.username);
    auth_response(state, StatusCode::OK, &user)
}

pub fn handle_logout() -> Result<Response<FullBody>> {
    success_message("Logged out successfully")
}

pub async fn handle_me(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    success(StatusCode::OK, json!({ "user": UserView::from(&user) }))
}
