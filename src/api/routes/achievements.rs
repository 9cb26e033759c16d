//! Achievement Routes
//!
//! Entry points for "achievement earned" events.
//!
//! - POST /api/v1/achievements - Submit one event
//! - POST /api/v1/achievements/backlog - Replay unnotified achievements
//! - POST /api/v1/achievements/evaluate - Global-first check, then submit

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{BacklogRequest, BacklogResponse, EvaluateRequest, EvaluateResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::notifications::{AchievementEvent, SubmitOutcome};

/// POST /api/v1/achievements
///
/// 202 with the outcome; suppressed duplicates are not an error.
pub async fn submit_achievement(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AchievementEvent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitOutcome>)> {
    let Json(event) = payload?;
    let outcome = state.scheduler.submit(event).await?;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

/// POST /api/v1/achievements/backlog
pub async fn submit_backlog(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BacklogRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BacklogResponse>)> {
    let Json(req) = payload?;
    let total = req.achievements.len();

    let outcomes = state.scheduler.submit_backlog(req.achievements).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(BacklogResponse {
            accepted: outcomes.len(),
            skipped: total - outcomes.len(),
            outcomes,
        }),
    ))
}

/// POST /api/v1/achievements/evaluate
///
/// Runs the global-first check and, when awarded, hands the event to the
/// scheduler.
pub async fn evaluate_achievement(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    let Json(req) = payload?;

    let evaluator = state
        .evaluator
        .as_ref()
        .ok_or_else(|| ApiError::Misconfigured("Achievement store not configured".to_string()))?;

    if req.user_id.trim().is_empty() {
        return Err(ApiError::Validation("Missing userId".to_string()));
    }

    let Some(event) = evaluator
        .evaluate(&req.user_id, &req.achievement, &req.criteria, &req.context)
        .await
    else {
        return Ok(Json(EvaluateResponse {
            awarded: false,
            event: None,
            outcome: None,
        }));
    };

    let outcome = state.scheduler.submit(event.clone()).await?;
    Ok(Json(EvaluateResponse {
        awarded: true,
        event: Some(event),
        outcome: Some(outcome),
    }))
}
