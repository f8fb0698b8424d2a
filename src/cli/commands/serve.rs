use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use crate::config::{AppConfig, initialize_app_state};
use crate::router::create_router;
use crate::schemas::AppState;

pub async fn serve(config: AppConfig) -> Result<()> {
    trace!("Entering serve function");
    info!("SmartSpend application starting up");
    debug!("Database URL: {}", config.database_url);
    debug!("Bind address: {}", config.bind_address);

    trace!("Initializing application state");
    let state = match initialize_app_state(config).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_server(state).await
}

/// Binds the configured address and serves the API until the process stops.
pub(crate) async fn run_server(state: AppState) -> Result<()> {
    let bind_address = state.config.bind_address.clone();
    if state.config.expose_tokens {
        info!("Verification and reset tokens are echoed in responses (expose_tokens)");
    }

    trace!("Creating application router");
    let app = create_router(state);
    debug!("Router created successfully");

    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("SmartSpend API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
