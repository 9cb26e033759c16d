//! Data Transfer Objects
//!
//! Request and response types for the API endpoints that are not already
//! domain types.

use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementCriteria, ItemContext};
use crate::notifications::{Achievement, AchievementEvent, SubmitOutcome};

// ============================================
// ACHIEVEMENT DTOs
// ============================================

/// Backlog replay request
#[derive(Debug, Deserialize)]
pub struct BacklogRequest {
    pub achievements: Vec<AchievementEvent>,
}

/// Backlog replay response
#[derive(Debug, Serialize)]
pub struct BacklogResponse {
    /// Entries accepted (shown, queued or suppressed)
    pub accepted: usize,
    /// Entries skipped for a missing identifier
    pub skipped: usize,
    pub outcomes: Vec<SubmitOutcome>,
}

/// Global-first evaluation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub achievement: Achievement,
    pub criteria: AchievementCriteria,
    #[serde(default)]
    pub context: ItemContext,
}

/// Global-first evaluation response
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub awarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<AchievementEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SubmitOutcome>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub places: String,
    pub auth: String,
    pub achievement_store: String,
    pub visible_toasts: usize,
    pub pending_toasts: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
