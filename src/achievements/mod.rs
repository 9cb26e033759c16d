//! Global-First Achievements
//!
//! Decides whether a newly photographed item is a "first": the first
//! sighting of a packaged product anywhere, or the user's first photo in a
//! country. Qualifying firsts are awarded through an [`AchievementStore`]
//! and returned as [`AchievementEvent`](crate::notifications::AchievementEvent)s
//! ready for the notification scheduler.

mod evaluator;
mod store;

pub use evaluator::{extract_country, is_likely_packaged_product, sanitize, GlobalFirstEvaluator};
pub use store::{AchievementStore, InMemoryStore, StoredItem, SupabaseStore};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Criteria `type` handled by the evaluator
pub const GLOBAL_FIRST: &str = "global_first";

/// Minimum AI confidence for a product first
pub const MIN_PRODUCT_CONFIDENCE: f64 = 0.6;

/// What was captured, as detected by the AI and entered by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemContext {
    #[serde(default)]
    pub ai_brand: Option<String>,
    #[serde(default)]
    pub ai_product_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    /// Set when the user typed a product name themselves
    #[serde(default)]
    pub user_product_name: Option<String>,
    /// Free-form "City, Country" location
    #[serde(default)]
    pub location: Option<String>,
}

/// Achievement criteria as stored alongside the achievement definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCriteria {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub scope: Option<String>,
}

impl AchievementCriteria {
    pub fn global_first(scope: impl Into<String>) -> Self {
        Self {
            kind: GLOBAL_FIRST.to_string(),
            scope: Some(scope.into()),
        }
    }
}

/// An item row as seen by the product check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRecord {
    #[serde(default)]
    pub ai_product_name: Option<String>,
    #[serde(default)]
    pub ai_brand: Option<String>,
}

/// Outcome of a successful award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardResult {
    /// Times earned, including this one
    pub count: u32,
}

/// Errors from an achievement store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    #[error("Unknown achievement: {0}")]
    UnknownAchievement(String),
}
