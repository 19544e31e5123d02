//! Health and smoke-test endpoints
//!
//! - `GET /health` - liveness plus database connectivity
//! - `GET /test` - fixed message for frontend connectivity checks

use chrono::{SecondsFormat, Utc};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::routes::response::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// "Connected" or "Disconnected"
    pub database: &'static str,
    /// Store backend in use ("mongodb" or "memory")
    pub backend: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub commit: &'static str,
    #[serde(rename = "buildTime")]
    pub build_time: &'static str,
    /// Uptime in seconds
    pub uptime: i64,
}

pub async fn health_check(state: &AppState) -> Response<FullBody> {
    let now = Utc::now();
    let connected = state.store.ping().await;

    let response = HealthResponse {
        status: "OK",
        database: if connected { "Connected" } else { "Disconnected" },
        backend: state.store.backend(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        uptime: (now - state.started_at).num_seconds().max(0),
    };

    json_response(StatusCode::OK, &response)
}

pub fn smoke_test() -> Response<FullBody> {
    json_response(StatusCode::OK, &json!({ "message": "Backend is working!" }))
}
