#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::router::create_router;
    use crate::schemas::{ApiResponse, AppState};
    use axum::Router;
    use axum::http::{HeaderName, HeaderValue, StatusCode, header};
    use axum_test::TestServer;
    use compute::identity::LogDelivery;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use serde_json::json;
    use tracing::Level;

    pub const TEST_PASSWORD: &str = "secret123";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Tokens are echoed so tests can play the user's inbox.
    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            expose_tokens: true,
            auto_verify_users: false,
            ..Default::default()
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let config = test_config();
        AppState {
            db: setup_test_db().await,
            identity: Arc::new(config.identity_settings()),
            delivery: Arc::new(LogDelivery),
            config: Arc::new(config),
        }
    }

    /// Log to STDERR at the level named by RUST_LOG, WARN by default.
    fn init_test_tracing() {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        init_test_tracing();
        create_router(setup_test_app_state().await)
    }

    pub async fn setup_test_server() -> TestServer {
        TestServer::new(setup_test_app().await).unwrap()
    }

    pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
        (
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }

    /// Registers, verifies and logs in a user; returns the bearer token.
    pub async fn register_and_login(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": email,
                "password": TEST_PASSWORD,
                "first_name": "Test",
                "last_name": "User",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let verification_token = body.data["verification_token"]
            .as_str()
            .expect("verification token is exposed in tests")
            .to_string();

        server
            .post("/api/v1/auth/verify")
            .json(&json!({ "token": verification_token }))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<serde_json::Value> = response.json();
        body.data["token"].as_str().unwrap().to_string()
    }

    /// Id of the seeded default category with this name.
    pub async fn default_category_id(server: &TestServer, name: &str) -> i64 {
        let body: ApiResponse<Vec<serde_json::Value>> =
            server.get("/api/v1/categories/defaults").await.json();
        body.data
            .iter()
            .find(|c| c["name"] == name)
            .and_then(|c| c["id"].as_i64())
            .unwrap_or_else(|| panic!("default category {} is seeded", name))
    }
}
