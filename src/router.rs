use crate::auth::require_user;
use crate::handlers::{
    auth::{
        change_password, delete_account, forgot_password, get_profile, login, logout, register,
        reset_password, update_profile, verify_email,
    },
    budgets::{
        create_budget, delete_budget, get_budget, get_budget_alerts, get_budget_summary,
        get_budgets, get_current_budgets, toggle_budget, update_budget,
    },
    categories::{
        create_category, delete_category, get_categories, get_categories_with_budgets,
        get_category, get_category_stats, get_category_usage, get_default_categories,
        update_category,
    },
    health::health_check,
    transactions::{
        create_transaction, delete_transaction, get_category_summary, get_monthly_trends,
        get_recent_transactions, get_transaction, get_transaction_stats, get_transactions,
        update_transaction,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Routes reachable without a bearer token
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/verify", post(verify_email))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route("/api/v1/categories/defaults", get(get_default_categories))
}

/// Routes behind [`require_user`]
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Account
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/profile", get(get_profile).put(update_profile))
        .route("/api/v1/auth/change-password", put(change_password))
        .route("/api/v1/auth/account", delete(delete_account))
        // Categories
        .route("/api/v1/categories", post(create_category).get(get_categories))
        .route("/api/v1/categories/with-budgets", get(get_categories_with_budgets))
        .route(
            "/api/v1/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/v1/categories/:id/stats", get(get_category_stats))
        .route("/api/v1/categories/:id/usage", get(get_category_usage))
        // Transactions
        .route("/api/v1/transactions", post(create_transaction).get(get_transactions))
        .route("/api/v1/transactions/recent", get(get_recent_transactions))
        .route("/api/v1/transactions/stats", get(get_transaction_stats))
        .route("/api/v1/transactions/summary/category", get(get_category_summary))
        .route("/api/v1/transactions/trends/monthly", get(get_monthly_trends))
        .route(
            "/api/v1/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        // Budgets
        .route("/api/v1/budgets", post(create_budget).get(get_budgets))
        .route("/api/v1/budgets/current", get(get_current_budgets))
        .route("/api/v1/budgets/alerts", get(get_budget_alerts))
        .route("/api/v1/budgets/summary", get(get_budget_summary))
        .route(
            "/api/v1/budgets/:id",
            get(get_budget).put(update_budget).delete(delete_budget),
        )
        .route("/api/v1/budgets/:id/toggle", patch(toggle_budget))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user))
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
