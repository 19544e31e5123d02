//! User profile endpoints
//!
//! - `GET /users/{id}` - profile with follower and following summaries
//! - `PATCH /users/{id}` - update one's own profile fields
//! - `POST /users/{id}/follow` and `/unfollow`

use hyper::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::db::schemas::UserPatch;
use crate::routes::response::{
    authenticate, parse_id, success, success_message, ApiRequest, FullBody,
};
use crate::server::AppState;
use crate::services::{profile_view, UserView};
use crate::types::{CivicError, Result};

/// Keys a user may change on their own profile
pub const EDITABLE_FIELDS: [&str; 6] = [
    "name",
    "bio",
    "avatar",
    "isPrivate",
    "locationAccess",
    "notifications",
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate {
    name: Option<String>,
    bio: Option<String>,
    avatar: Option<String>,
    is_private: Option<bool>,
    location_access: Option<bool>,
    notifications: Option<bool>,
}

/// Reject unknown keys, then build the patch
fn profile_patch(body: Map<String, Value>) -> Result<UserPatch> {
    if !body.keys().all(|k| EDITABLE_FIELDS.contains(&k.as_str())) {
        return Err(CivicError::bad_request("Invalid updates"));
    }
    let update: ProfileUpdate = serde_json::from_value(Value::Object(body))?;

    let name = update.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(CivicError::bad_request("Name cannot be empty"));
    }

    Ok(UserPatch {
        name,
        bio: update.bio,
        avatar: update.avatar,
        is_private: update.is_private,
        location_access: update.location_access,
        notifications: update.notifications,
        ..UserPatch::default()
    })
}

fn user_not_found() -> CivicError {
    CivicError::not_found("User not found")
}

pub async fn handle_get(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<FullBody>> {
    authenticate(state, req).await?;
    let user = state
        .store
        .get_user(parse_id(id)?)
        .await?
        .ok_or_else(user_not_found)?;

    let profile = profile_view(state.store.as_ref(), &user).await?;
    success(StatusCode::OK, json!({ "user": profile }))
}

pub async fn handle_update(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    if user.id_hex() != id {
        return Err(CivicError::Forbidden(
            "You can only update your own profile".into(),
        ));
    }

    let patch = profile_patch(req.json()?)?;
    let updated = state
        .store
        .update_user(parse_id(id)?, &patch)
        .await?
        .ok_or_else(user_not_found)?;

    success(StatusCode::OK, json!({ "user": UserView::from(&updated) }))
}

pub async fn handle_follow(
    state: &AppState,
    req: &ApiRequest,
    id: &str,
    follow: bool,
) -> Result<Response<FullBody>> {
    let user = authenticate(state, req).await?;
    let verb = if follow { "follow" } else { "unfollow" };
    if user.id_hex() == id {
        return Err(CivicError::bad_request(format!("You cannot {} yourself", verb)));
    }

    let target = state
        .store
        .get_user(parse_id(id)?)
        .await?
        .ok_or_else(user_not_found)?;
    let (Some(me), Some(them)) = (user._id, target._id) else {
        return Err(user_not_found());
    };

    let following = user.following.contains(&them);
    if follow && following {
        return Err(CivicError::bad_request("You are already following this user"));
    }
    if !follow && !following {
        return Err(CivicError::bad_request("You are not following this user"));
    }

    state.store.set_follow(me, them, follow).await?;
    info!(follower = %user.username, followee = %target.username, "{} ok", verb);

    success_message(if follow {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_profile_patch_allowed_fields() {
        let patch = profile_patch(body(json!({ "bio": "Ward 12 volunteer", "isPrivate": true }))).unwrap();
        assert_eq!(patch.bio.as_deref(), Some("Ward 12 volunteer"));
        assert_eq!(patch.is_private, Some(true));
        assert!(patch.role.is_none());
    }

    #[test]
    fn test_profile_patch_rejects_other_fields() {
        let err = profile_patch(body(json!({ "name": "x", "role": "admin" }))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid updates");

        let err = profile_patch(body(json!({ "isVerified": true }))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid updates");
    }

    #[test]
    fn test_profile_patch_blank_name() {
        assert!(profile_patch(body(json!({ "name": "  " }))).is_err());
    }
}
