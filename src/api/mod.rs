//! Bestlist Edge API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Edge functions
//! - `POST /functions/v1/search-places` - Google Places proxy
//! - `POST /functions/v1/username-login` - Username + password sign-in
//!
//! ## Achievements
//! - `POST /api/v1/achievements` - Submit an earned achievement
//! - `POST /api/v1/achievements/backlog` - Replay unnotified achievements
//! - `POST /api/v1/achievements/evaluate` - Global-first check
//!
//! ## Notifications
//! - `GET /api/v1/notifications` - Visible toasts and modal
//! - `DELETE /api/v1/notifications/modal` - Dismiss the modal
//! - `DELETE /api/v1/notifications/:id` - Dismiss a toast
//! - `POST /api/v1/notifications/reset` - Clear all presentation state
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Notification event stream
//!
//! # Example
//!
//! ```rust,ignore
//! use bestlist::api::{serve, AppState};
//! use bestlist::auth::UsernameLogin;
//! use bestlist::config::Config;
//! use bestlist::notifications::NotificationScheduler;
//! use bestlist::places::PlacesClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default();
//!     let scheduler = NotificationScheduler::new((&config.notifications).into());
//!     let places = PlacesClient::new(config.places.clone())?;
//!     let server = config.server.clone();
//!
//!     let state = AppState::new(config, scheduler, places, UsernameLogin::unconfigured());
//!     serve(state, &server).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs.max(1));

    let function_routes = Router::new()
        .route("/search-places", post(routes::places::search_places))
        .route("/username-login", post(routes::login::username_login));

    let api_routes = Router::new()
        // Achievement intake
        .route("/achievements", post(routes::achievements::submit_achievement))
        .route("/achievements/backlog", post(routes::achievements::submit_backlog))
        .route("/achievements/evaluate", post(routes::achievements::evaluate_achievement))
        // Presentation state
        .route("/notifications", get(routes::notifications::get_notifications))
        .route("/notifications/reset", post(routes::notifications::reset_notifications))
        .route("/notifications/modal", delete(routes::notifications::dismiss_modal))
        .route("/notifications/:id", delete(routes::notifications::dismiss_toast));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/functions/v1", function_routes)
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        // the socket outlives any request timeout
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server, returning after a graceful shutdown
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Bestlist edge API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Bestlist edge API shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
