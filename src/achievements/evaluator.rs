//! Global-first evaluation

use serde_json::json;
use std::sync::Arc;

use super::{AchievementCriteria, AchievementStore, ItemContext, StoreError, GLOBAL_FIRST, MIN_PRODUCT_CONFIDENCE};
use crate::notifications::{Achievement, AchievementEvent};

/// Words that mark a prepared dish rather than a packaged product
const DISH_WORDS: [&str; 10] = [
    "plate", "bowl", "soup", "salad", "pizza", "pasta", "ravioli", "ramen", "steak", "sandwich",
];

/// Lowercase, collapse non-alphanumeric runs to one space, trim
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut gap = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if gap && !out.is_empty() {
                out.push(' ');
            }
            out.push(c);
            gap = false;
        } else {
            gap = true;
        }
    }
    out
}

/// An optional context field, with empty strings treated as absent
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Branded, and not named like a dish
pub fn is_likely_packaged_product(ctx: &ItemContext) -> bool {
    let has_brand = present(&ctx.ai_brand).is_some_and(|brand| sanitize(brand).len() >= 2);
    if !has_brand {
        return false;
    }

    let name = sanitize(
        present(&ctx.ai_product_name)
            .or(present(&ctx.product_name))
            .unwrap_or_default(),
    );
    !DISH_WORDS.iter().any(|w| {
        name.contains(&format!(" {} ", w))
            || name.ends_with(&format!(" {}", w))
            || name.starts_with(&format!("{} ", w))
    })
}

/// Last comma-separated part of a "City, Country" location
pub fn extract_country(location: &str) -> Option<&str> {
    location
        .rsplit(',')
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Checks and awards global-first achievements
pub struct GlobalFirstEvaluator {
    store: Arc<dyn AchievementStore>,
}

impl GlobalFirstEvaluator {
    pub fn new(store: Arc<dyn AchievementStore>) -> Self {
        Self { store }
    }

    /// Evaluate one achievement for a freshly captured item
    ///
    /// Returns the event to present when the achievement was awarded. Store
    /// failures are logged and treated as "not a first".
    pub async fn evaluate(
        &self,
        user_id: &str,
        achievement: &Achievement,
        criteria: &AchievementCriteria,
        ctx: &ItemContext,
    ) -> Option<AchievementEvent> {
        if criteria.kind != GLOBAL_FIRST {
            return None;
        }
        let Some(achievement_id) = achievement.id.as_deref() else {
            tracing::warn!("Global-first achievement without an id");
            return None;
        };

        match self.check(user_id, achievement_id, criteria, ctx).await {
            Ok(Some(count)) => {
                let is_global = criteria.scope.as_deref() == Some("global");
                tracing::info!(
                    user_id,
                    achievement_id,
                    scope = ?criteria.scope,
                    count,
                    "Awarded global-first achievement"
                );
                Some(
                    AchievementEvent::new(achievement.clone())
                        .global_first(is_global)
                        .count(count),
                )
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(user_id, achievement_id, error = %e, "Global-first check failed");
                None
            }
        }
    }

    async fn check(
        &self,
        user_id: &str,
        achievement_id: &str,
        criteria: &AchievementCriteria,
        ctx: &ItemContext,
    ) -> Result<Option<u32>, StoreError> {
        match criteria.scope.as_deref() {
            Some("product") if present(&ctx.ai_product_name).is_some() => {
                if !self.is_product_first(user_id, achievement_id, ctx).await? {
                    return Ok(None);
                }
            }
            Some("country") if present(&ctx.location).is_some() => {
                let location = present(&ctx.location).unwrap_or_default();
                let Some(country) = extract_country(location) else {
                    return Ok(None);
                };
                tracing::debug!(location, country, "Checking country first");

                let list_ids = self.store.user_list_ids(user_id).await?;
                if !list_ids.is_empty()
                    && self.store.user_has_item_in_location(&list_ids, country).await?
                {
                    return Ok(None);
                }
            }
            scope => {
                tracing::debug!(?scope, "Unsupported scope or missing context");
                return Ok(None);
            }
        }

        let award = self
            .store
            .award_achievement(user_id, achievement_id, json!({ "context": ctx }))
            .await?;
        Ok(award.map(|a| a.count))
    }

    async fn is_product_first(
        &self,
        user_id: &str,
        achievement_id: &str,
        ctx: &ItemContext,
    ) -> Result<bool, StoreError> {
        let confident = ctx.ai_confidence.map_or(true, |c| c >= MIN_PRODUCT_CONFIDENCE);
        let manual_name = present(&ctx.user_product_name).is_some();
        if !is_likely_packaged_product(ctx) || !confident || manual_name {
            tracing::debug!(
                confident,
                manual_name,
                "Skipping product first"
            );
            return Ok(false);
        }

        if self.store.user_has_achievement(user_id, achievement_id).await? {
            tracing::debug!(user_id, achievement_id, "User already holds product first");
            return Ok(false);
        }

        let name = sanitize(present(&ctx.ai_product_name).unwrap_or_default());
        let brand = present(&ctx.ai_brand).unwrap_or_default().trim();

        let existing = self.store.items_by_brand_with_image(brand).await?;
        let matches = existing
            .iter()
            .filter(|item| sanitize(item.ai_product_name.as_deref().unwrap_or_default()) == name)
            .count();
        tracing::debug!(brand, name = %name, with_brand = existing.len(), matches, "Product first lookup");

        Ok(matches == 0)
    }
}
