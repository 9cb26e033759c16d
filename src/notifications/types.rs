//! Notification Types
//!
//! Achievement payloads as they arrive from game logic, the records the
//! presentation layer renders, and the events broadcast on every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Dedup class used when an achievement carries no explicit type
pub const DEFAULT_ACHIEVEMENT_TYPE: &str = "achievement";

/// Achievement rarity tier
///
/// Unknown tiers are kept, trimmed and lowercased, so they round-trip
/// through the API. A null or blank rarity is common.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
    Other(String),
}

impl Rarity {
    /// Ordering weight, most prestigious first when sorted descending
    pub fn rank(&self) -> u8 {
        match self {
            Rarity::Legendary => 4,
            Rarity::Epic => 3,
            Rarity::Rare => 2,
            Rarity::Common => 1,
            Rarity::Other(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Other(s) => s,
        }
    }
}

impl From<String> for Rarity {
    fn from(s: String) -> Self {
        let tier = s.trim().to_lowercase();
        match tier.as_str() {
            "" | "common" => Rarity::Common,
            "rare" => Rarity::Rare,
            "epic" => Rarity::Epic,
            "legendary" => Rarity::Legendary,
            _ => Rarity::Other(tier),
        }
    }
}

impl From<Option<String>> for Rarity {
    fn from(s: Option<String>) -> Self {
        s.map(Rarity::from).unwrap_or_default()
    }
}

impl From<&str> for Rarity {
    fn from(s: &str) -> Self {
        Rarity::from(s.to_string())
    }
}

impl From<Rarity> for String {
    fn from(r: Rarity) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An earned achievement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub rarity: Rarity,
    /// Dedup class; defaults to [`DEFAULT_ACHIEVEMENT_TYPE`]
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Achievement {
    pub fn new(id: impl Into<String>, rarity: impl Into<Rarity>) -> Self {
        Self {
            id: Some(id.into()),
            rarity: rarity.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Derive the dedup key: `{id or name}:{type or default}`
    ///
    /// Blank identifiers count as missing.
    pub fn dedup_key(&self) -> Result<String, NotificationError> {
        let ident = non_blank(self.id.as_deref())
            .or_else(|| non_blank(self.name.as_deref()))
            .ok_or(NotificationError::MissingIdentifier)?;
        let kind = non_blank(self.kind.as_deref()).unwrap_or(DEFAULT_ACHIEVEMENT_TYPE);
        Ok(format!("{}:{}", ident, kind))
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// An "achievement earned" event from the evaluation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementEvent {
    pub achievement: Achievement,
    #[serde(default, alias = "is_global_first")]
    pub is_global_first: bool,
    /// Times earned, for repeatable achievements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, alias = "earned_at", skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

impl AchievementEvent {
    pub fn new(achievement: Achievement) -> Self {
        Self {
            achievement,
            is_global_first: false,
            count: None,
            earned_at: None,
        }
    }

    pub fn global_first(mut self, is_global_first: bool) -> Self {
        self.is_global_first = is_global_first;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

/// How a notification is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Transient, queued, individually dismissible
    Toast,
    /// Blocking single slot, last write wins
    Modal,
}

/// A notification record held by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(flatten)]
    pub event: AchievementEvent,
    pub presentation: Presentation,
    /// Creation time (submission, not display)
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(event: AchievementEvent, presentation: Presentation) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            presentation,
            timestamp: Utc::now(),
        }
    }

    pub fn achievement(&self) -> &Achievement {
        &self.event.achievement
    }
}

/// Current presentation state
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationSnapshot {
    /// Visible toasts, oldest first
    pub toasts: Vec<Notification>,
    pub modal: Option<Notification>,
    /// Toasts waiting out the cooldown
    pub pending: usize,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Seen within the dedup window; nothing happened
    Suppressed,
    /// Now the current modal
    Modal { id: Uuid },
    /// Queued as a toast, visible after `delay_ms`
    Toast {
        id: Uuid,
        #[serde(rename = "delay_ms", serialize_with = "serialize_millis")]
        delay: Duration,
    },
}

impl SubmitOutcome {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            SubmitOutcome::Suppressed => None,
            SubmitOutcome::Modal { id } | SubmitOutcome::Toast { id, .. } => Some(*id),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, SubmitOutcome::Suppressed)
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Why a toast left the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    Manual,
    Expired,
}

/// State change broadcast to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    ToastShown { notification: Notification },
    ToastDismissed { id: Uuid, reason: DismissReason },
    ModalShown { notification: Notification },
    ModalDismissed { id: Uuid },
    Reset,
}

/// Errors from the notification scheduler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Achievement has neither an id nor a name")]
    MissingIdentifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_prefers_id() {
        let a = Achievement::new("first_photo", Rarity::Common).name("First Photo");
        assert_eq!(a.dedup_key().unwrap(), "first_photo:achievement");
    }

    #[test]
    fn test_dedup_key_falls_back_to_name_and_type() {
        let a = Achievement {
            name: Some("Globetrotter".to_string()),
            kind: Some("country".to_string()),
            ..Default::default()
        };
        assert_eq!(a.dedup_key().unwrap(), "Globetrotter:country");
    }

    #[test]
    fn test_dedup_key_requires_identifier() {
        let blank = Achievement {
            id: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.dedup_key(), Err(NotificationError::MissingIdentifier));
        assert_eq!(
            Achievement::default().dedup_key(),
            Err(NotificationError::MissingIdentifier)
        );
    }

    #[test]
    fn test_rarity_parsing() {
        assert_eq!(Rarity::from("Legendary"), Rarity::Legendary);
        assert_eq!(Rarity::from("mythic"), Rarity::Other("mythic".to_string()));
        assert_eq!(Rarity::from(" Mythic "), Rarity::from("mythic"));
        assert_eq!(Rarity::from(""), Rarity::Common);
        assert!(Rarity::Legendary.rank() > Rarity::Rare.rank());
    }

    #[test]
    fn test_null_rarity_is_common() {
        let json = r#"{"achievement": {"id": "n", "rarity": null}}"#;
        let event: AchievementEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.achievement.rarity, Rarity::Common);

        let event: AchievementEvent = serde_json::from_str(r#"{"achievement": {"id": "m"}}"#).unwrap();
        assert_eq!(event.achievement.rarity, Rarity::Common);
    }

    #[test]
    fn test_event_deserialize_camel_and_snake() {
        let camel = r#"{"achievement": {"id": "a", "rarity": "legendary"}, "isGlobalFirst": true}"#;
        let event: AchievementEvent = serde_json::from_str(camel).unwrap();
        assert!(event.is_global_first);
        assert_eq!(event.achievement.rarity, Rarity::Legendary);

        let snake = r#"{"achievement": {"name": "b"}, "is_global_first": true}"#;
        let event: AchievementEvent = serde_json::from_str(snake).unwrap();
        assert!(event.is_global_first);
        assert_eq!(event.achievement.rarity, Rarity::Common);
    }

    #[test]
    fn test_notification_serializes_flat() {
        let event = AchievementEvent::new(Achievement::new("a", "rare"));
        let n = Notification::new(event, Presentation::Toast);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["achievement"]["id"], "a");
        assert_eq!(json["achievement"]["rarity"], "rare");
        assert_eq!(json["isGlobalFirst"], false);
        assert_eq!(json["presentation"], "toast");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_submit_outcome_serialize() {
        let outcome = SubmitOutcome::Toast {
            id: Uuid::nil(),
            delay: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"toast\""));
        assert!(json.contains("\"delay_ms\":1500"));
    }
}
