//! # Bestlist Edge
//!
//! Server-side pieces of the Bestlist food-logging app: achievement
//! notification scheduling, global-first achievement checks, a Google
//! Places search proxy and username-based sign-in.
//!
//! ## Modules
//!
//! - [`notifications`]: Dedup, toast/modal classification and toast rate limiting
//! - [`achievements`]: Global-first product and country checks
//! - [`places`]: Google Places proxy with legacy fallback
//! - [`auth`]: Username + password sign-in
//! - [`supabase`]: REST client for the hosted backend
//! - [`api`]: HTTP API with Axum
//! - [`websocket`]: Live notification stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bestlist::notifications::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = NotificationScheduler::new(SchedulerConfig::default());
//!     let mut events = scheduler.subscribe();
//!
//!     scheduler
//!         .submit(AchievementEvent::new(
//!             Achievement::new("first_photo", Rarity::Common).name("First Photo"),
//!         ))
//!         .await?;
//!
//!     println!("{:?}", events.recv().await?);
//!
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod achievements;
pub mod api;
pub mod auth;
pub mod config;
pub mod notifications;
pub mod places;
pub mod supabase;
pub mod websocket;

// Re-export top-level types for convenience
pub use notifications::{
    Achievement, AchievementEvent, NotificationError, NotificationEvent, NotificationScheduler,
    NotificationSnapshot, Rarity, SchedulerConfig, SubmitOutcome,
};

pub use achievements::{
    AchievementCriteria, AchievementStore, GlobalFirstEvaluator, InMemoryStore, ItemContext,
    StoreError, SupabaseStore,
};

pub use places::{ApiUsed, PlaceResult, PlaceSearchRequest, PlaceSearchResponse, PlacesClient, PlacesError};

pub use auth::{AuthBackend, LoginError, LoginRequest, Session, SupabaseAuth, UsernameLogin};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{websocket_handler, ClientMessage, ServerMessage};

pub use config::{Config, ConfigError, LoggingConfig};
