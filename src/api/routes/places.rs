//! Place Search Route
//!
//! - POST /functions/v1/search-places

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::places::{PlaceSearchRequest, PlaceSearchResponse};

/// POST /functions/v1/search-places
///
/// Upstream failures still answer 200 with `apiUsed: "none"`.
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceSearchRequest>, JsonRejection>,
) -> ApiResult<Json<PlaceSearchResponse>> {
    let Json(req) = payload?;
    let response = state.places.search(&req).await?;
    Ok(Json(response))
}
