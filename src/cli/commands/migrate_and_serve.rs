use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::apply_migrations;
use super::serve::run_server;
use crate::config::{AppConfig, initialize_app_state};

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", config.database_url);

    let state = match initialize_app_state(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    // Migrate through the serving connection
    apply_migrations(&state.db).await?;
    run_server(state).await
}
