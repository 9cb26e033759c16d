//! Bestlist Edge Server
//!
//! Run with: cargo run --bin bestlist-edge
//!
//! # Configuration
//!
//! Read from `config.toml` (see `bestlist-cli config`), then overridden by:
//! - `BESTLIST_HOST`, `BESTLIST_PORT`: bind address (default: 0.0.0.0:8787)
//! - `GOOGLE_PLACES_API_KEY`: enables place search
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`: enable login and global-first checks
//! - `SUPABASE_ANON_KEY`: key for password sign-in (default: service role key)
//! - `BESTLIST_LOG_LEVEL`, `BESTLIST_LOG_FORMAT`: logging (`RUST_LOG` wins)

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bestlist::achievements::{GlobalFirstEvaluator, SupabaseStore};
use bestlist::api::{serve, AppState};
use bestlist::auth::{SupabaseAuth, UsernameLogin};
use bestlist::config::{Config, LoggingConfig, SupabaseConfig};
use bestlist::notifications::NotificationScheduler;
use bestlist::places::PlacesClient;
use bestlist::supabase::SupabaseClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting Bestlist edge server v{}", env!("CARGO_PKG_VERSION"));

    let scheduler = NotificationScheduler::new((&config.notifications).into());

    let places = PlacesClient::new(config.places.clone()).context("Failed to build Places client")?;
    if !places.is_configured() {
        tracing::warn!("GOOGLE_PLACES_API_KEY not set, place search will answer 500");
    }

    let login = match SupabaseAuth::from_config(&config.supabase)? {
        Some(auth) => UsernameLogin::new(Arc::new(auth)),
        None => {
            tracing::warn!("Supabase not configured, username login will answer 500");
            UsernameLogin::unconfigured()
        }
    };

    let store = achievement_store(&config.supabase)?;
    let server = config.server.clone();

    let mut state = AppState::new(config, scheduler.clone(), places, login);
    if let Some(store) = store {
        state = state.with_evaluator(GlobalFirstEvaluator::new(Arc::new(store)));
        tracing::info!("Global-first evaluation enabled");
    }

    serve(state, &server).await?;

    scheduler.shutdown().await;
    tracing::info!("Bestlist edge server stopped");

    Ok(())
}

/// Achievement store backed by the service role key, when configured
fn achievement_store(config: &SupabaseConfig) -> anyhow::Result<Option<SupabaseStore>> {
    let (Some(url), Some(key)) = (config.url.as_deref(), config.service_role_key.as_deref()) else {
        return Ok(None);
    };
    let client = SupabaseClient::new(url, key).context("Failed to build Supabase client")?;
    Ok(Some(SupabaseStore::new(client)))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "bestlist={level},bestlist_edge={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
