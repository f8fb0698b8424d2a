use std::sync::Arc;

use compute::identity::{IdentityService, IdentitySettings, TokenDelivery};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

pub use common::{ApiResponse, DateWindow, Pagination};

use crate::config::AppConfig;
use crate::handlers::{auth, budgets, categories, health, transactions};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub identity: Arc<IdentitySettings>,
    /// Out-of-band delivery of verification and reset tokens
    pub delivery: Arc<dyn TokenDelivery>,
}

impl AppState {
    pub fn identity_service(&self) -> IdentityService<'_> {
        IdentityService::new(&self.db, &self.identity, self.delivery.as_ref())
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Extra detail for errors the caller can act on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::verify_email,
        auth::login,
        auth::logout,
        auth::get_profile,
        auth::update_profile,
        auth::change_password,
        auth::forgot_password,
        auth::reset_password,
        auth::delete_account,
        categories::create_category,
        categories::get_categories,
        categories::get_default_categories,
        categories::get_categories_with_budgets,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        categories::get_category_stats,
        categories::get_category_usage,
        transactions::create_transaction,
        transactions::get_transactions,
        transactions::get_transaction,
        transactions::update_transaction,
        transactions::delete_transaction,
        transactions::get_recent_transactions,
        transactions::get_transaction_stats,
        transactions::get_category_summary,
        transactions::get_monthly_trends,
        budgets::create_budget,
        budgets::get_budgets,
        budgets::get_current_budgets,
        budgets::get_budget_alerts,
        budgets::get_budget_summary,
        budgets::get_budget,
        budgets::update_budget,
        budgets::toggle_budget,
        budgets::delete_budget,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Pagination,
            DateWindow,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::VerifyEmailRequest,
            auth::UpdateProfileRequest,
            auth::ChangePasswordRequest,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            auth::DeleteAccountRequest,
            auth::UserResponse,
            auth::RegisterResponse,
            auth::LoginResponse,
            auth::ProfileResponse,
            auth::ProfileStatsResponse,
            auth::ForgotPasswordResponse,
            categories::CategoryRequest,
            categories::CategoryResponse,
            categories::CategoryListItem,
            categories::CategoryWithBudgetResponse,
            categories::CategoryStatsResponse,
            categories::MonthlyUsageResponse,
            transactions::TransactionRequest,
            transactions::TransactionResponse,
            transactions::TransactionPage,
            transactions::CategoryTotalResponse,
            transactions::CategorySummaryResponse,
            transactions::TransactionStatsResponse,
            budgets::CreateBudgetRequest,
            budgets::UpdateBudgetRequest,
            budgets::BudgetResponse,
            budgets::BudgetSummaryResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, sessions and profile"),
        (name = "categories", description = "Default and custom categories"),
        (name = "transactions", description = "Expense and income records"),
        (name = "budgets", description = "Budgets, spending and alerts"),
    ),
    info(
        title = "SmartSpend API",
        description = "Personal finance tracking API - expenses, income, categories and budget alerts",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
