//! Achievement persistence
//!
//! The queries the global-first checks need, behind a trait so the
//! evaluator can run against the hosted database or an in-memory fixture.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AwardResult, ItemRecord, StoreError};
use crate::supabase::SupabaseClient;

#[async_trait]
pub trait AchievementStore: Send + Sync {
    async fn user_has_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool, StoreError>;

    /// Items of an exact brand that carry a photo
    async fn items_by_brand_with_image(&self, brand: &str) -> Result<Vec<ItemRecord>, StoreError>;

    async fn user_list_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    /// Whether any photographed item in `list_ids` has a location containing
    /// `needle`, case-insensitively
    async fn user_has_item_in_location(&self, list_ids: &[String], needle: &str) -> Result<bool, StoreError>;

    /// Record an award
    ///
    /// Repeatable achievements bump their count. Non-repeatable ones already
    /// held yield `None`.
    async fn award_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: Value,
    ) -> Result<Option<AwardResult>, StoreError>;
}

// ============================================
// Supabase
// ============================================

/// PostgREST-backed store; needs the service role key
pub struct SupabaseStore {
    client: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct DefinitionRow {
    #[serde(default)]
    is_repeatable: bool,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    #[serde(default)]
    count: Option<u32>,
}

/// Row ids may be uuids or integers
fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn is_repeatable(&self, achievement_id: &str) -> Result<bool, StoreError> {
        let rows: Vec<DefinitionRow> = self
            .client
            .select(
                "achievements",
                "is_repeatable",
                &[("id", format!("eq.{}", achievement_id)), ("limit", "1".to_string())],
            )
            .await?;

        rows.into_iter()
            .next()
            .map(|r| r.is_repeatable)
            .ok_or_else(|| StoreError::UnknownAchievement(achievement_id.to_string()))
    }

    fn award_filters(user_id: &str, achievement_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("user_id", format!("eq.{}", user_id)),
            ("achievement_id", format!("eq.{}", achievement_id)),
        ]
    }
}

#[async_trait]
impl AchievementStore for SupabaseStore {
    async fn user_has_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool, StoreError> {
        let mut filters = Self::award_filters(user_id, achievement_id);
        filters.push(("limit", "1".to_string()));

        let rows: Vec<IdRow> = self.client.select("user_achievements", "id", &filters).await?;
        Ok(!rows.is_empty())
    }

    async fn items_by_brand_with_image(&self, brand: &str) -> Result<Vec<ItemRecord>, StoreError> {
        let rows = self
            .client
            .select(
                "items",
                "id,ai_product_name,ai_brand,created_at",
                &[
                    ("ai_brand", format!("eq.{}", brand)),
                    ("image_url", "not.is.null".to_string()),
                ],
            )
            .await?;
        Ok(rows)
    }

    async fn user_list_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<IdRow> = self
            .client
            .select("lists", "id", &[("user_id", format!("eq.{}", user_id))])
            .await?;
        Ok(rows.into_iter().map(|r| id_string(r.id)).collect())
    }

    async fn user_has_item_in_location(&self, list_ids: &[String], needle: &str) -> Result<bool, StoreError> {
        if list_ids.is_empty() {
            return Ok(false);
        }

        let rows: Vec<IdRow> = self
            .client
            .select(
                "items",
                "id",
                &[
                    ("list_id", format!("in.({})", list_ids.join(","))),
                    ("location", format!("ilike.*{}*", needle)),
                    ("image_url", "not.is.null".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn award_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: Value,
    ) -> Result<Option<AwardResult>, StoreError> {
        let filters = Self::award_filters(user_id, achievement_id);

        if self.is_repeatable(achievement_id).await? {
            let mut lookup = filters.clone();
            lookup.push(("limit", "1".to_string()));
            let existing: Vec<CountRow> = self
                .client
                .select("user_achievements", "id,count", &lookup)
                .await?;

            if let Some(row) = existing.into_iter().next() {
                let count = row.count.unwrap_or(0) + 1;
                let _: Vec<Value> = self
                    .client
                    .update(
                        "user_achievements",
                        &filters,
                        &json!({
                            "count": count,
                            "progress_data": progress,
                            "earned_at": Utc::now().to_rfc3339(),
                            // cleared so the award surfaces again as pending
                            "notified_at": Value::Null,
                        }),
                    )
                    .await?;
                tracing::debug!(user_id, achievement_id, count, "Incremented repeatable achievement");
                return Ok(Some(AwardResult { count }));
            }
        } else if self.user_has_achievement(user_id, achievement_id).await? {
            return Ok(None);
        }

        let _: Vec<Value> = self
            .client
            .insert(
                "user_achievements",
                &json!({
                    "user_id": user_id,
                    "achievement_id": achievement_id,
                    "progress_data": progress,
                    "count": 1,
                }),
            )
            .await?;
        tracing::debug!(user_id, achievement_id, "Inserted achievement");
        Ok(Some(AwardResult { count: 1 }))
    }
}

// ============================================
// In-memory
// ============================================

/// A photographed item held by [`InMemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct StoredItem {
    pub list_id: String,
    pub ai_brand: Option<String>,
    pub ai_product_name: Option<String>,
    pub location: Option<String>,
    pub has_image: bool,
}

#[derive(Default)]
struct MemoryState {
    /// achievement id → repeatable
    definitions: HashMap<String, bool>,
    /// (user, achievement) → count
    awards: HashMap<(String, String), u32>,
    /// user → list ids
    lists: HashMap<String, Vec<String>>,
    items: Vec<StoredItem>,
}

/// Process-local store for demos and tests
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn define_achievement(&self, achievement_id: &str, repeatable: bool) {
        self.state
            .write()
            .await
            .definitions
            .insert(achievement_id.to_string(), repeatable);
    }

    pub async fn add_list(&self, user_id: &str, list_id: &str) {
        self.state
            .write()
            .await
            .lists
            .entry(user_id.to_string())
            .or_default()
            .push(list_id.to_string());
    }

    pub async fn add_item(&self, item: StoredItem) {
        self.state.write().await.items.push(item);
    }

    /// Times `user_id` has earned `achievement_id`
    pub async fn award_count(&self, user_id: &str, achievement_id: &str) -> u32 {
        self.state
            .read()
            .await
            .awards
            .get(&(user_id.to_string(), achievement_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AchievementStore for InMemoryStore {
    async fn user_has_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool, StoreError> {
        Ok(self.award_count(user_id, achievement_id).await > 0)
    }

    async fn items_by_brand_with_image(&self, brand: &str) -> Result<Vec<ItemRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|item| item.has_image && item.ai_brand.as_deref() == Some(brand))
            .map(|item| ItemRecord {
                ai_product_name: item.ai_product_name.clone(),
                ai_brand: item.ai_brand.clone(),
            })
            .collect())
    }

    async fn user_list_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        Ok(state.lists.get(user_id).cloned().unwrap_or_default())
    }

    async fn user_has_item_in_location(&self, list_ids: &[String], needle: &str) -> Result<bool, StoreError> {
        let needle = needle.to_lowercase();
        let state = self.state.read().await;
        Ok(state.items.iter().any(|item| {
            item.has_image
                && list_ids.contains(&item.list_id)
                && item
                    .location
                    .as_deref()
                    .is_some_and(|loc| loc.to_lowercase().contains(&needle))
        }))
    }

    async fn award_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        _progress: Value,
    ) -> Result<Option<AwardResult>, StoreError> {
        let mut state = self.state.write().await;
        let repeatable = *state
            .definitions
            .get(achievement_id)
            .ok_or_else(|| StoreError::UnknownAchievement(achievement_id.to_string()))?;

        let count = state
            .awards
            .entry((user_id.to_string(), achievement_id.to_string()))
            .or_insert(0);
        if *count > 0 && !repeatable {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(AwardResult { count: *count }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::HeaderMap,
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap as Map;

    #[tokio::test]
    async fn test_memory_award_non_repeatable_once() {
        let store = InMemoryStore::new();
        store.define_achievement("first_country", false).await;

        let first = store.award_achievement("u1", "first_country", Value::Null).await.unwrap();
        assert_eq!(first, Some(AwardResult { count: 1 }));

        let second = store.award_achievement("u1", "first_country", Value::Null).await.unwrap();
        assert_eq!(second, None);
        assert_eq!(store.award_count("u1", "first_country").await, 1);
    }

    #[tokio::test]
    async fn test_memory_award_repeatable_counts() {
        let store = InMemoryStore::new();
        store.define_achievement("first_product", true).await;

        store.award_achievement("u1", "first_product", Value::Null).await.unwrap();
        let again = store.award_achievement("u1", "first_product", Value::Null).await.unwrap();
        assert_eq!(again, Some(AwardResult { count: 2 }));
    }

    #[tokio::test]
    async fn test_memory_unknown_achievement() {
        let store = InMemoryStore::new();
        let err = store.award_achievement("u1", "nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownAchievement(_)));
    }

    #[tokio::test]
    async fn test_memory_location_match_is_case_insensitive_and_scoped() {
        let store = InMemoryStore::new();
        store
            .add_item(StoredItem {
                list_id: "l1".to_string(),
                location: Some("Lyon, France".to_string()),
                has_image: true,
                ..Default::default()
            })
            .await;

        let mine = vec!["l1".to_string()];
        let theirs = vec!["l2".to_string()];
        assert!(store.user_has_item_in_location(&mine, "FRANCE").await.unwrap());
        assert!(!store.user_has_item_in_location(&theirs, "France").await.unwrap());
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(json!("abc")), "abc");
        assert_eq!(id_string(json!(42)), "42");
    }

    #[tokio::test]
    async fn test_supabase_location_query() {
        let router = Router::new().route(
            "/rest/v1/items",
            get(|headers: HeaderMap, Query(q): Query<Map<String, String>>| async move {
                assert_eq!(headers["apikey"], "service");
                assert_eq!(q["list_id"], "in.(1,2)");
                assert_eq!(q["location"], "ilike.*Japan*");
                assert_eq!(q["image_url"], "not.is.null");
                Json(json!([{"id": 7}]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = SupabaseClient::new(format!("http://{}", addr), "service").unwrap();
        let store = SupabaseStore::new(client);

        let ids = vec!["1".to_string(), "2".to_string()];
        assert!(store.user_has_item_in_location(&ids, "Japan").await.unwrap());
        assert!(!store.user_has_item_in_location(&[], "Japan").await.unwrap());
    }
}
