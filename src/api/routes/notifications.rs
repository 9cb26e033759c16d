//! Notification Routes
//!
//! Presentation state for clients that poll rather than hold a WebSocket.
//!
//! - GET /api/v1/notifications - Current toasts and modal
//! - DELETE /api/v1/notifications/modal - Dismiss the modal
//! - DELETE /api/v1/notifications/:id - Dismiss a toast
//! - POST /api/v1/notifications/reset - Clear everything

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::notifications::NotificationSnapshot;

/// GET /api/v1/notifications
pub async fn get_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationSnapshot> {
    Json(state.scheduler.snapshot().await)
}

/// DELETE /api/v1/notifications/:id
pub async fn dismiss_toast(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::Validation(format!("Invalid notification id: {}", id)))?;

    if state.scheduler.dismiss(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Toast {} not found", id)))
    }
}

/// DELETE /api/v1/notifications/modal
///
/// Idempotent: 204 whether or not a modal was showing.
pub async fn dismiss_modal(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.dismiss_modal().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/notifications/reset
pub async fn reset_notifications(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.reset().await;
    StatusCode::NO_CONTENT
}
