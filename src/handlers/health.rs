use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{instrument, warn};

use crate::schemas::{AppState, HealthResponse};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Database is unreachable", body = HealthResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    match state.db.ping().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            version,
            database: "connected".to_string(),
        })),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    version,
                    database: "disconnected".to_string(),
                }),
            ))
        }
    }
}
