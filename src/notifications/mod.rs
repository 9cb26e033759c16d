//! Achievement Notifications
//!
//! Decides whether, when and how an earned achievement is presented.
//!
//! ## Rules
//!
//! - The same achievement key is shown at most once per 30 seconds
//! - Legendary and global-first achievements take the single modal slot,
//!   replacing whatever is there
//! - Everything else becomes a toast; toasts are spaced at least 2 seconds
//!   apart and deferred, never dropped
//!
//! ## Example
//!
//! ```rust,no_run
//! use bestlist::notifications::*;
//!
//! # async fn demo() -> Result<(), NotificationError> {
//! let scheduler = NotificationScheduler::new(SchedulerConfig::default());
//!
//! let outcome = scheduler
//!     .submit(AchievementEvent::new(Achievement::new("first_photo", Rarity::Common)))
//!     .await?;
//! println!("{:?}", outcome);
//!
//! let snapshot = scheduler.snapshot().await;
//! println!("{} toasts visible", snapshot.toasts.len());
//! # Ok(())
//! # }
//! ```

mod ledger;
mod scheduler;
mod types;

pub use ledger::DedupLedger;
pub use scheduler::{NotificationScheduler, SchedulerConfig};
pub use types::{
    Achievement, AchievementEvent, DismissReason, Notification, NotificationError,
    NotificationEvent, NotificationSnapshot, Presentation, Rarity, SubmitOutcome,
    DEFAULT_ACHIEVEMENT_TYPE,
};
