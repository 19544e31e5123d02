//! `GET /wards` - wards of the configured city

use hyper::{Response, StatusCode};
use serde_json::json;

use crate::routes::response::{success, FullBody};
use crate::server::AppState;
use crate::services::WardView;
use crate::types::Result;

pub async fn handle_list(state: &AppState) -> Result<Response<FullBody>> {
    let wards: Vec<WardView> = state
        .store
        .list_wards(&state.args.city)
        .await?
        .iter()
        .map(WardView::from)
        .collect();

    success(StatusCode::OK, json!({ "wards": wards }))
}
