//! HTTP routes for civicconnect
//!
//! [`dispatch`] reads the request, matches `(method, path segments)` and
//! renders handler errors into the `{"status": "error"}` envelope.

pub mod admin;
pub mod auth_routes;
pub mod feed;
pub mod health;
pub mod issues;
pub mod response;
pub mod users;
pub mod wards;

use bytes::Bytes;
use hyper::{Method, Request, Response};
use std::net::SocketAddr;
use tracing::{debug, error, info};

use crate::db::schemas::{IssueStatus, VoteKind};
use crate::server::AppState;
use crate::types::{CivicError, Result};

pub use response::{error_response, ApiRequest, FullBody};

/// Route one request to its handler
pub async fn dispatch<B>(state: &AppState, addr: SocketAddr, req: Request<B>) -> Response<FullBody>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    if req.method() == Method::OPTIONS {
        return response::cors_preflight();
    }

    let result = match ApiRequest::read(addr, req).await {
        Ok(req) => route(state, &req).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!("[{}] {} {}", addr, status, err);
            } else {
                debug!("[{}] {} {}", addr, status, err);
            }
            error_response(&err)
        }
    }
}

async fn route(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let segments: Vec<&str> = req
        .path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (&req.method, segments.as_slice()) {
        // Misc
        (&Method::GET, ["health"]) => Ok(health::health_check(state).await),
        (&Method::GET, ["test"]) => Ok(health::smoke_test()),

        // Auth
        (&Method::POST, ["auth", "register"]) => auth_routes::handle_register(state, req).await,
        (&Method::POST, ["auth", "login"]) => auth_routes::handle_login(state, req).await,
        (&Method::GET, ["auth", "logout"]) => auth_routes::handle_logout(),
        (&Method::GET, ["auth", "me"]) => auth_routes::handle_me(state, req).await,

        // Issues
        (&Method::GET, ["issues"]) => issues::handle_list(state, req).await,
        (&Method::POST, ["issues"]) => issues::handle_create(state, req).await,
        (&Method::GET, ["issues", "clustered"]) => issues::handle_clustered(state).await,
        (&Method::GET, ["issues", id]) => issues::handle_get(state, id).await,
        (&Method::POST, ["issues", id, action]) => match *action {
            "upvote" => issues::handle_vote(state, req, id, VoteKind::Up).await,
            "downvote" => issues::handle_vote(state, req, id, VoteKind::Down).await,
            "like" => issues::handle_like(state, req, id).await,
            "comment" => issues::handle_comment(state, req, id).await,
            "acknowledge" => {
                issues::handle_transition(state, req, id, IssueStatus::Acknowledged).await
            }
            "progress" => issues::handle_transition(state, req, id, IssueStatus::InProgress).await,
            "resolve" => issues::handle_transition(state, req, id, IssueStatus::Resolved).await,
            "reply" => issues::handle_reply(state, req, id).await,
            _ => Err(route_not_found(req)),
        },

        // Feeds
        (&Method::GET, ["feed", "trending"]) => feed::handle_trending(state, req).await,
        (&Method::GET, ["feed", "prioritized"]) => feed::handle_prioritized(state, req).await,

        // Wards
        (&Method::GET, ["wards"]) => wards::handle_list(state).await,

        // Users
        (&Method::GET, ["users", id]) => users::handle_get(state, req, id).await,
        (&Method::PATCH, ["users", id]) => users::handle_update(state, req, id).await,
        (&Method::POST, ["users", id, "follow"]) => users::handle_follow(state, req, id, true).await,
        (&Method::POST, ["users", id, "unfollow"]) => {
            users::handle_follow(state, req, id, false).await
        }

        // Admin
        (&Method::GET, ["admin", "users"]) => admin::handle_list_users(state, req).await,
        (&Method::POST, ["admin", "users", id, "verify"]) => {
            admin::handle_verify(state, req, id).await
        }
        (&Method::POST, ["admin", "users", id, "role"]) => {
            admin::handle_set_role(state, req, id).await
        }
        (&Method::POST, ["admin", "bootstrap"]) => admin::handle_bootstrap(state, req).await,
        (&Method::POST, ["admin", "issues", "seed"]) => admin::handle_seed_issues(state, req).await,
        (&Method::POST, ["admin", "wards", "seed"]) => admin::handle_seed_wards(state, req).await,

        _ => Err(route_not_found(req)),
    }
}

fn route_not_found(req: &ApiRequest) -> CivicError {
    CivicError::not_found(format!("Route {} {} not found", req.method, req.path))
}
