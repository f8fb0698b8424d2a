use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use compute::identity::{IdentitySettings, LogDelivery};
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://smartspend.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Runtime settings. Sources, lowest precedence first: built-in defaults,
/// an optional `smartspend.toml`, then `SMARTSPEND_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub session_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
    /// Skip email verification for new users.
    pub auto_verify_users: bool,
    /// Echo verification and reset tokens in API responses. Development only.
    pub expose_tokens: bool,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            session_ttl_hours: 168,
            reset_token_ttl_minutes: 60,
            auto_verify_users: false,
            expose_tokens: false,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let settings = Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("session_ttl_hours", defaults.session_ttl_hours)?
            .set_default("reset_token_ttl_minutes", defaults.reset_token_ttl_minutes)?
            .set_default("auto_verify_users", defaults.auto_verify_users)?
            .set_default("expose_tokens", defaults.expose_tokens)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .add_source(File::with_name("smartspend").required(false))
            .add_source(Environment::with_prefix("SMARTSPEND").try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn identity_settings(&self) -> IdentitySettings {
        IdentitySettings {
            session_ttl: chrono::Duration::hours(self.session_ttl_hours),
            reset_token_ttl: chrono::Duration::minutes(self.reset_token_ttl_minutes),
            auto_verify: self.auto_verify_users,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Connects to the configured database and builds the shared state.
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    Ok(AppState {
        db,
        identity: Arc::new(config.identity_settings()),
        delivery: Arc::new(LogDelivery),
        config: Arc::new(config),
    })
}
