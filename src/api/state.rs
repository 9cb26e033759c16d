//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::achievements::GlobalFirstEvaluator;
use crate::auth::UsernameLogin;
use crate::config::Config;
use crate::notifications::NotificationScheduler;
use crate::places::PlacesClient;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Toast/modal scheduler; clones share state
    pub scheduler: NotificationScheduler,
    pub places: Arc<PlacesClient>,
    pub login: Arc<UsernameLogin>,
    /// Global-first evaluation, when an achievement store is configured
    pub evaluator: Option<Arc<GlobalFirstEvaluator>>,
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        scheduler: NotificationScheduler,
        places: PlacesClient,
        login: UsernameLogin,
    ) -> Self {
        Self {
            scheduler,
            places: Arc::new(places),
            login: Arc::new(login),
            evaluator: None,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Enable the global-first evaluation endpoint
    pub fn with_evaluator(mut self, evaluator: GlobalFirstEvaluator) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
