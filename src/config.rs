//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub places: PlacesConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Achievement notification scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_dedup_window")]
    pub dedup_window_secs: u64,

    #[serde(default = "default_ledger_retention")]
    pub ledger_retention_secs: u64,

    #[serde(default = "default_toast_cooldown")]
    pub toast_cooldown_ms: u64,

    #[serde(default = "default_modal_rarities")]
    pub modal_rarities: Vec<String>,

    #[serde(default = "default_true")]
    pub global_first_is_modal: bool,

    #[serde(default = "default_toast_auto_dismiss")]
    pub toast_auto_dismiss_ms: Option<u64>,
}

fn default_dedup_window() -> u64 {
    30
}

fn default_ledger_retention() -> u64 {
    60
}

fn default_toast_cooldown() -> u64 {
    2000
}

fn default_modal_rarities() -> Vec<String> {
    vec!["legendary".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_toast_auto_dismiss() -> Option<u64> {
    Some(3000)
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: default_dedup_window(),
            ledger_retention_secs: default_ledger_retention(),
            toast_cooldown_ms: default_toast_cooldown(),
            modal_rarities: default_modal_rarities(),
            global_first_is_modal: default_true(),
            toast_auto_dismiss_ms: default_toast_auto_dismiss(),
        }
    }
}

/// Google Places proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesConfig {
    /// Google Places API key; searches fail with 500 without it
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_new_api_base")]
    pub new_api_base: String,

    #[serde(default = "default_legacy_api_base")]
    pub legacy_api_base: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_radius")]
    pub radius_meters: u32,

    #[serde(default = "default_places_timeout")]
    pub request_timeout_ms: u64,
}

fn default_new_api_base() -> String {
    "https://places.googleapis.com".to_string()
}

fn default_legacy_api_base() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_max_results() -> usize {
    6
}

fn default_radius() -> u32 {
    50_000 // 50 km
}

fn default_places_timeout() -> u64 {
    10_000
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            new_api_base: default_new_api_base(),
            legacy_api_base: default_legacy_api_base(),
            max_results: default_max_results(),
            radius_meters: default_radius(),
            request_timeout_ms: default_places_timeout(),
        }
    }
}

/// Hosted backend (Supabase) configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,

    pub service_role_key: Option<String>,

    /// Falls back to the service role key when unset
    pub anon_key: Option<String>,
}

impl SupabaseConfig {
    /// URL and service key are both present
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|s| !s.is_empty())
            && self.service_role_key.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Key used for password sign-in
    pub fn effective_anon_key(&self) -> Option<&str> {
        self.anon_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.service_role_key.as_deref())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("bestlist").join("config.toml")),
            Some(PathBuf::from("/etc/bestlist/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("BESTLIST_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BESTLIST_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Places overrides
        if let Ok(key) = std::env::var("GOOGLE_PLACES_API_KEY") {
            self.places.api_key = Some(key);
        }

        // Supabase overrides
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            self.supabase.url = Some(url);
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(key);
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = Some(key);
        }

        // Logging overrides
        if let Ok(level) = std::env::var("BESTLIST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BESTLIST_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Bestlist Edge Configuration
#
# Environment variables override these settings:
# - BESTLIST_HOST
# - BESTLIST_PORT
# - GOOGLE_PLACES_API_KEY
# - SUPABASE_URL
# - SUPABASE_SERVICE_ROLE_KEY
# - SUPABASE_ANON_KEY
# - BESTLIST_LOG_LEVEL
# - BESTLIST_LOG_FORMAT

[server]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 8787

# Request timeout in seconds
request_timeout_secs = 30

[notifications]
# Suppress repeats of the same achievement within this window (seconds)
dedup_window_secs = 30

# Forget dedup entries older than this (seconds)
ledger_retention_secs = 60

# Minimum spacing between toasts (ms)
toast_cooldown_ms = 2000

# Rarities shown as a blocking modal
modal_rarities = ["legendary"]

# Show global-first achievements as a modal
global_first_is_modal = true

# Remove toasts automatically after this long (ms); 0 keeps them until dismissed
toast_auto_dismiss_ms = 3000

[places]
# Google Places API key
# api_key = ""

# API endpoints
new_api_base = "https://places.googleapis.com"
legacy_api_base = "https://maps.googleapis.com"

# Results returned per search
max_results = 6

# Location bias radius (meters)
radius_meters = 50000

# Upstream request timeout (ms)
request_timeout_ms = 10000

[supabase]
# Project URL and keys
# url = "https://your-project.supabase.co"
# service_role_key = ""
# anon_key = ""

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
