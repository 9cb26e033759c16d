//! Username Login Route
//!
//! - POST /functions/v1/username-login

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::{LoginRequest, Session};

/// POST /functions/v1/username-login
pub async fn username_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    let Json(req) = payload?;
    let session = state.login.login(&req).await?;
    Ok(Json(session))
}
