//! Request context and response helpers shared by all handlers

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::warn;

use crate::auth::extract_token_from_header;
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{CivicError, Result};

pub type FullBody = Full<Bytes>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const ALLOW_METHODS: &str = "GET, POST, PATCH, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to get access.";
pub const INVALID_TOKEN: &str = "Invalid token. Please log in again.";
pub const USER_GONE: &str = "The user belonging to this token no longer exists.";

/// A request with its body already read
#[derive(Debug)]
pub struct ApiRequest {
    pub addr: SocketAddr,
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    /// Read the body (up to [`MAX_BODY_BYTES`]) and split out the query string
    pub async fn read<B>(addr: SocketAddr, req: Request<B>) -> Result<Self>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let body = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| CivicError::bad_request(format!("Failed to read body: {}", e)))?
            .to_bytes();

        let query = parts
            .uri
            .query()
            .map(serde_urlencoded::from_str::<HashMap<String, String>>)
            .transpose()
            .map_err(|e| CivicError::bad_request(format!("Invalid query string: {}", e)))?
            .unwrap_or_default();

        Ok(Self {
            addr,
            method: parts.method,
            path: parts.uri.path().to_string(),
            query,
            headers: parts.headers,
            body,
        })
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Deserialize the JSON body; an empty body reads as `{}`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Resolve the bearer token to a live user
pub async fn authenticate(state: &AppState, req: &ApiRequest) -> Result<UserDoc> {
    let token = extract_token_from_header(req.auth_header())
        .ok_or_else(|| CivicError::Unauthorized(NOT_LOGGED_IN.into()))?;

    let claims = state.jwt.verify_token(token).map_err(|e| {
        warn!("[{}] rejected token: {}", req.addr, e);
        CivicError::Unauthorized(INVALID_TOKEN.into())
    })?;
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| CivicError::Unauthorized(INVALID_TOKEN.into()))?;

    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| CivicError::Unauthorized(USER_GONE.into()))
}

/// Parse a path id segment
pub fn parse_id(raw: &str) -> Result<ObjectId> {
    Ok(ObjectId::parse_str(raw)?)
}

fn with_cors(mut response: Response<FullBody>) -> Response<FullBody> {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_cors(response)
}

/// `{"status": "success", "data": data}`
pub fn success<T: Serialize>(status: StatusCode, data: T) -> Result<Response<FullBody>> {
    Ok(json_response(
        status,
        &json!({ "status": "success", "data": data }),
    ))
}

/// `{"status": "success", "message": message}`
pub fn success_message(message: &str) -> Result<Response<FullBody>> {
    Ok(json_response(
        StatusCode::OK,
        &json!({ "status": "success", "message": message }),
    ))
}

pub fn error_response(err: &CivicError) -> Response<FullBody> {
    json_response(
        err.status_code(),
        &json!({ "status": "error", "message": err.to_string() }),
    )
}

pub fn cors_preflight() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    with_cors(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn request(uri: &str, body: &'static str) -> ApiRequest {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        ApiRequest::read("127.0.0.1:9".parse().unwrap(), req)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_and_body() {
        let req = request("/feed/trending?page=2&limit=&status=In%20Progress", "{\"a\":1}").await;
        assert_eq!(req.path, "/feed/trending");
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.query("limit"), None);
        assert_eq!(req.query("status"), Some("In Progress"));

        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let req = request("/x", "  ").await;
        let value: HashMap<String, serde_json::Value> = req.json().unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let big = vec![b'x'; MAX_BODY_BYTES + 1];
        let req = Request::builder()
            .uri("/issues")
            .body(Full::new(Bytes::from(big)))
            .unwrap();
        let err = ApiRequest::read("127.0.0.1:9".parse().unwrap(), req)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_envelope_has_cors() {
        let resp = error_response(&CivicError::Forbidden("Admin access required".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(cors_preflight().status(), StatusCode::NO_CONTENT);
    }
}
