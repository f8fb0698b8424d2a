use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime};
use compute::BudgetEngine;
use compute::budgets::{
    BudgetChanges, BudgetFilter, BudgetSummary, BudgetView, DEFAULT_ALERT_THRESHOLD, NewBudget,
};
use model::entities::budget::BudgetPeriod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{parse_period, today};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a budget
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBudgetRequest {
    #[validate(range(min = 1))]
    pub category_id: i32,
    /// Strictly positive
    #[schema(example = "500.00")]
    pub amount: Decimal,
    /// `monthly` (default) or `yearly`
    pub period: Option<String>,
    pub start_date: NaiveDate,
    /// Must be after `start_date`
    pub end_date: NaiveDate,
}

/// Request body for replacing a budget. The category cannot change.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateBudgetRequest {
    #[schema(example = "500.00")]
    pub amount: Decimal,
    /// `monthly` (default) or `yearly`
    pub period: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Keeps the current status when omitted
    pub is_active: Option<bool>,
}

fn period_or_monthly(period: Option<&str>) -> ApiResult<BudgetPeriod> {
    period.map(parse_period).transpose().map(|p| p.unwrap_or(BudgetPeriod::Monthly))
}

/// Budget with its category and derived spending figures
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetResponse {
    pub id: i32,
    pub category_id: i32,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub category_icon: Option<String>,
    pub amount: Decimal,
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    /// Expenses in the category inside the budget window
    pub spent_amount: Decimal,
    /// `amount - spent_amount`; negative when overspent
    pub remaining_amount: Decimal,
    /// `spent / amount * 100`, two decimal places
    pub usage_percentage: Decimal,
    pub transaction_count: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<BudgetView> for BudgetResponse {
    fn from(view: BudgetView) -> Self {
        let budget = view.budget;
        Self {
            id: budget.id,
            category_id: budget.category_id,
            category_name: view.category_name,
            category_color: view.category_color,
            category_icon: view.category_icon,
            amount: budget.amount,
            period: budget.period.as_str().to_string(),
            start_date: budget.start_date,
            end_date: budget.end_date,
            is_active: budget.is_active,
            spent_amount: view.metrics.spent,
            remaining_amount: view.metrics.remaining,
            usage_percentage: view.metrics.usage_percentage,
            transaction_count: view.metrics.transaction_count,
            created_at: budget.created_at,
            updated_at: budget.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetSummaryResponse {
    pub total_budgets: u64,
    pub active_budgets: u64,
    pub total_budget_amount: Decimal,
    pub total_spent: Decimal,
    pub avg_usage_percentage: Decimal,
}

impl From<BudgetSummary> for BudgetSummaryResponse {
    fn from(summary: BudgetSummary) -> Self {
        Self {
            total_budgets: summary.total_budgets,
            active_budgets: summary.active_budgets,
            total_budget_amount: summary.total_budget_amount,
            total_spent: summary.total_spent,
            avg_usage_percentage: summary.avg_usage_percentage,
        }
    }
}

/// Query parameters for listing budgets
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct BudgetQuery {
    pub is_active: Option<bool>,
    /// `monthly` or `yearly`
    pub period: Option<String>,
    pub category_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct AlertQuery {
    /// Usage percentage at or above which a budget is reported (default: 80)
    pub threshold: Option<Decimal>,
}

/// Create a budget for a category
#[utoipa::path(
    post,
    path = "/api/v1/budgets",
    tag = "budgets",
    security(("bearer_auth" = [])),
    request_body = CreateBudgetRequest,
    responses(
        (status = 201, description = "Budget created successfully", body = ApiResponse<BudgetResponse>),
        (status = 400, description = "Invalid request, invalid category or duplicate budget", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn create_budget(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<CreateBudgetRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BudgetResponse>>)> {
    trace!("Entering create_budget function");
    debug!(
        "Creating budget of {} for category {}",
        request.amount, request.category_id
    );

    let new = NewBudget {
        category_id: request.category_id,
        amount: request.amount,
        period: period_or_monthly(request.period.as_deref())?,
        start_date: request.start_date,
        end_date: request.end_date,
    };
    let view = BudgetEngine::new(&state.db).create(current.id(), new).await?;

    info!("Created budget {}", view.budget.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(view.into(), "Budget created successfully")),
    ))
}

/// List budgets with spending, newest first
#[utoipa::path(
    get,
    path = "/api/v1/budgets",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(BudgetQuery),
    responses(
        (status = 200, description = "Budgets retrieved successfully", body = ApiResponse<Vec<BudgetResponse>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_budgets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<BudgetQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetResponse>>>> {
    let filter = BudgetFilter {
        is_active: query.is_active,
        period: query.period.as_deref().map(parse_period).transpose()?,
        category_id: query.category_id,
    };
    let views = BudgetEngine::new(&state.db)
        .list_for_user(current.id(), &filter)
        .await?;
    debug!("Retrieved {} budgets", views.len());
    Ok(Json(ApiResponse::ok(
        views.into_iter().map(BudgetResponse::from).collect(),
        "Budgets retrieved successfully",
    )))
}

/// Active budgets whose window contains today, highest usage first
#[utoipa::path(
    get,
    path = "/api/v1/budgets/current",
    tag = "budgets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current budgets retrieved successfully", body = ApiResponse<Vec<BudgetResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn get_current_budgets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetResponse>>>> {
    let views = BudgetEngine::new(&state.db)
        .current(current.id(), today())
        .await?;
    Ok(Json(ApiResponse::ok(
        views.into_iter().map(BudgetResponse::from).collect(),
        "Current budgets retrieved successfully",
    )))
}

/// Current budgets at or above a usage threshold
#[utoipa::path(
    get,
    path = "/api/v1/budgets/alerts",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(AlertQuery),
    responses(
        (status = 200, description = "Budget alerts retrieved successfully", body = ApiResponse<Vec<BudgetResponse>>),
        (status = 400, description = "Invalid threshold", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_budget_alerts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<AlertQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetResponse>>>> {
    let threshold = query
        .threshold
        .unwrap_or_else(|| Decimal::from(DEFAULT_ALERT_THRESHOLD));
    if threshold.is_sign_negative() {
        return Err(ApiError::BadRequest(
            "Threshold must not be negative".to_string(),
        ));
    }

    let alerts = BudgetEngine::new(&state.db)
        .alerts(current.id(), threshold, today())
        .await?;
    if !alerts.is_empty() {
        info!("{} budget(s) at or above {}% for user {}", alerts.len(), threshold, current.id());
    }
    Ok(Json(ApiResponse::ok(
        alerts.into_iter().map(BudgetResponse::from).collect(),
        "Budget alerts retrieved successfully",
    )))
}

/// Aggregates over all budgets of the caller
#[utoipa::path(
    get,
    path = "/api/v1/budgets/summary",
    tag = "budgets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Budget summary retrieved successfully", body = ApiResponse<BudgetSummaryResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn get_budget_summary(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<BudgetSummaryResponse>>> {
    let summary = BudgetEngine::new(&state.db).summary(current.id()).await?;
    Ok(Json(ApiResponse::ok(
        summary.into(),
        "Budget summary retrieved successfully",
    )))
}

/// Get a budget with spending
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{id}",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Budget ID")),
    responses(
        (status = 200, description = "Budget retrieved successfully", body = ApiResponse<BudgetResponse>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_budget(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<BudgetResponse>>> {
    let Some(view) = BudgetEngine::new(&state.db)
        .get_with_spending(id, current.id())
        .await?
    else {
        warn!("Budget {} not found", id);
        return Err(ApiError::NotFound("Budget"));
    };
    Ok(Json(ApiResponse::ok(view.into(), "Budget retrieved successfully")))
}

/// Replace a budget
#[utoipa::path(
    put,
    path = "/api/v1/budgets/{id}",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Budget ID")),
    request_body = UpdateBudgetRequest,
    responses(
        (status = 200, description = "Budget updated successfully", body = ApiResponse<BudgetResponse>),
        (status = 400, description = "Invalid request or duplicate budget", body = ErrorResponse),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.id()))]
pub async fn update_budget(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<UpdateBudgetRequest>>,
) -> ApiResult<Json<ApiResponse<BudgetResponse>>> {
    let engine = BudgetEngine::new(&state.db);
    let existing = engine
        .get_with_spending(id, current.id())
        .await?
        .ok_or(ApiError::NotFound("Budget"))?;

    let changes = BudgetChanges {
        amount: request.amount,
        period: period_or_monthly(request.period.as_deref())?,
        start_date: request.start_date,
        end_date: request.end_date,
        is_active: request.is_active.unwrap_or(existing.budget.is_active),
    };
    if !engine.update(id, current.id(), changes).await? {
        warn!("Budget {} disappeared during update", id);
        return Err(ApiError::NotFound("Budget"));
    }

    let view = engine
        .get_with_spending(id, current.id())
        .await?
        .ok_or(ApiError::NotFound("Budget"))?;
    info!("Updated budget {}", id);
    Ok(Json(ApiResponse::ok(view.into(), "Budget updated successfully")))
}

/// Flip a budget between active and inactive
#[utoipa::path(
    patch,
    path = "/api/v1/budgets/{id}/toggle",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Budget ID")),
    responses(
        (status = 200, description = "Budget status toggled successfully", body = ApiResponse<BudgetResponse>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn toggle_budget(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<BudgetResponse>>> {
    let view = BudgetEngine::new(&state.db)
        .toggle_status(id, current.id())
        .await?;

    let message = if view.budget.is_active {
        "Budget activated successfully"
    } else {
        "Budget deactivated successfully"
    };
    info!("Budget {} is now {}", id, if view.budget.is_active { "active" } else { "inactive" });
    Ok(Json(ApiResponse::ok(view.into(), message)))
}

/// Delete a budget
#[utoipa::path(
    delete,
    path = "/api/v1/budgets/{id}",
    tag = "budgets",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Budget ID")),
    responses(
        (status = 200, description = "Budget deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn delete_budget(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<String>>> {
    if !BudgetEngine::new(&state.db).delete(id, current.id()).await? {
        warn!("Budget {} not found for deletion", id);
        return Err(ApiError::NotFound("Budget"));
    }
    info!("Deleted budget {}", id);
    Ok(Json(ApiResponse::ok(
        format!("Budget {} deleted", id),
        "Budget deleted successfully",
    )))
}
