use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime};
use compute::CategoryStore;
use compute::categories::{CategoryBudgetRow, CategoryInput, CategoryStats, CategorySummary};
use compute::metrics::MonthlyBucket;
use model::entities::category;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{check_hex_color, today};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::schemas::{ApiResponse, AppState, DateWindow, ErrorResponse};

/// Request body for creating or replacing a category
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    /// Hex color, `#rrggbb` or `#rgb` (default `#007bff`)
    pub color: Option<String>,
    /// Emoji or short symbol
    #[validate(length(max = 10))]
    pub icon: Option<String>,
}

impl CategoryRequest {
    fn into_input(self) -> ApiResult<CategoryInput> {
        if let Some(color) = &self.color {
            check_hex_color(color)?;
        }
        Ok(CategoryInput {
            name: self.name.trim().to_string(),
            description: self.description,
            color: self.color,
            icon: self.icon,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub is_default: bool,
    /// True for categories owned by the caller
    pub is_custom: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            is_custom: model.user_id.is_some(),
            id: model.id,
            name: model.name,
            description: model.description,
            color: model.color,
            icon: model.icon,
            is_default: model.is_default,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Category with lifetime usage of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryListItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub is_default: bool,
    pub is_custom: bool,
    pub transaction_count: u64,
    pub total_expenses: Decimal,
    pub total_income: Decimal,
}

impl From<CategorySummary> for CategoryListItem {
    fn from(summary: CategorySummary) -> Self {
        let category = summary.category;
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            color: category.color,
            icon: category.icon,
            is_default: category.is_default,
            is_custom: summary.is_custom,
            transaction_count: summary.transaction_count,
            total_expenses: summary.total_expenses,
            total_income: summary.total_income,
        }
    }
}

/// One row per category and active budget; budget fields are null without one
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryWithBudgetResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub is_default: bool,
    pub is_custom: bool,
    pub budget_id: Option<i32>,
    pub budget_amount: Option<Decimal>,
    pub budget_period: Option<String>,
    pub budget_start_date: Option<NaiveDate>,
    pub budget_end_date: Option<NaiveDate>,
    pub spent_amount: Decimal,
}

impl From<CategoryBudgetRow> for CategoryWithBudgetResponse {
    fn from(row: CategoryBudgetRow) -> Self {
        Self {
            id: row.category.id,
            name: row.category.name,
            color: row.category.color,
            icon: row.category.icon,
            is_default: row.category.is_default,
            is_custom: row.is_custom,
            budget_id: row.budget_id,
            budget_amount: row.budget_amount,
            budget_period: row.budget_period.map(|p| p.as_str().to_string()),
            budget_start_date: row.budget_start_date,
            budget_end_date: row.budget_end_date,
            spent_amount: row.spent_amount,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryStatsResponse {
    pub category_id: i32,
    pub expense_count: u64,
    pub income_count: u64,
    pub total_expenses: Decimal,
    pub total_income: Decimal,
    pub avg_expense: Decimal,
    pub avg_income: Decimal,
    /// The window the figures cover
    pub period: DateWindow,
}

impl CategoryStatsResponse {
    fn new(category_id: i32, stats: CategoryStats, period: DateWindow) -> Self {
        Self {
            category_id,
            expense_count: stats.expense_count,
            income_count: stats.income_count,
            total_expenses: stats.total_expenses,
            total_income: stats.total_income,
            avg_expense: stats.avg_expense,
            avg_income: stats.avg_income,
            period,
        }
    }
}

/// Transactions of one kind in one calendar month
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlyUsageResponse {
    /// `YYYY-MM`
    pub month: String,
    /// `expense` or `income`
    #[serde(rename = "type")]
    pub kind: String,
    pub transaction_count: u64,
    pub total_amount: Decimal,
}

impl From<MonthlyBucket> for MonthlyUsageResponse {
    fn from(bucket: MonthlyBucket) -> Self {
        Self {
            month: bucket.month,
            kind: bucket.kind.as_str().to_string(),
            transaction_count: bucket.transaction_count,
            total_amount: bucket.total_amount,
        }
    }
}

/// Date window for category statistics (defaults to the current month)
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct CategoryStatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct UsageQuery {
    /// Trailing months to cover (default: 12)
    #[validate(range(min = 1, max = 120))]
    pub months: Option<u32>,
}

/// Create a custom category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request or duplicate name", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<CategoryRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CategoryResponse>>)> {
    trace!("Entering create_category function");
    debug!("Creating category: {}", request.name);

    let category = CategoryStore::new(&state.db)
        .create(current.id(), request.into_input()?)
        .await?;

    info!("Created category {} for user {}", category.id, current.id());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(category.into(), "Category created successfully")),
    ))
}

/// List default and own categories with usage totals
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<CategoryListItem>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn get_categories(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryListItem>>>> {
    let summaries = CategoryStore::new(&state.db).list_for_user(current.id()).await?;
    debug!("Retrieved {} categories", summaries.len());
    Ok(Json(ApiResponse::ok(
        summaries.into_iter().map(CategoryListItem::from).collect(),
        "Categories retrieved successfully",
    )))
}

/// List the system default categories
#[utoipa::path(
    get,
    path = "/api/v1/categories/defaults",
    tag = "categories",
    responses(
        (status = 200, description = "Default categories retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn get_default_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryResponse>>>> {
    let defaults = CategoryStore::new(&state.db).list_defaults().await?;
    Ok(Json(ApiResponse::ok(
        defaults.into_iter().map(CategoryResponse::from).collect(),
        "Default categories retrieved successfully",
    )))
}

/// Categories joined with their active budgets and spending
#[utoipa::path(
    get,
    path = "/api/v1/categories/with-budgets",
    tag = "categories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Categories with budgets retrieved successfully", body = ApiResponse<Vec<CategoryWithBudgetResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn get_categories_with_budgets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryWithBudgetResponse>>>> {
    let rows = CategoryStore::new(&state.db)
        .list_with_budgets(current.id(), today())
        .await?;
    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(CategoryWithBudgetResponse::from).collect(),
        "Categories with budgets retrieved successfully",
    )))
}

/// Get a category visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category retrieved successfully", body = ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<CategoryResponse>>> {
    let Some(category) = CategoryStore::new(&state.db)
        .find_by_id(id, current.id())
        .await?
    else {
        warn!("Category {} not found", id);
        return Err(ApiError::NotFound("Category"));
    };
    Ok(Json(ApiResponse::ok(category.into(), "Category retrieved successfully")))
}

/// Replace an own category
#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request, duplicate name or default category", body = ErrorResponse),
        (status = 404, description = "Category not found or owned by another user", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.id()))]
pub async fn update_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<CategoryRequest>>,
) -> ApiResult<Json<ApiResponse<CategoryResponse>>> {
    let store = CategoryStore::new(&state.db);
    if !store.update(id, current.id(), request.into_input()?).await? {
        warn!("Category {} cannot be updated by user {}", id, current.id());
        return Err(ApiError::NotFound("Category"));
    }

    let category = store
        .find_by_id(id, current.id())
        .await?
        .ok_or(ApiError::NotFound("Category"))?;
    info!("Updated category {}", id);
    Ok(Json(ApiResponse::ok(category.into(), "Category updated successfully")))
}

/// Delete an own category that no transaction uses
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted successfully", body = ApiResponse<String>),
        (status = 400, description = "Default categories cannot be deleted", body = ErrorResponse),
        (status = 404, description = "Category not found or owned by another user", body = ErrorResponse),
        (status = 409, description = "Category is used by transactions", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn delete_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<String>>> {
    if !CategoryStore::new(&state.db).delete(id, current.id()).await? {
        warn!("Category {} cannot be deleted by user {}", id, current.id());
        return Err(ApiError::NotFound("Category"));
    }
    info!("Deleted category {}", id);
    Ok(Json(ApiResponse::ok(
        format!("Category {} deleted", id),
        "Category deleted successfully",
    )))
}

/// Counts and totals of a category in a date window
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/stats",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID"), CategoryStatsQuery),
    responses(
        (status = 200, description = "Category statistics retrieved successfully", body = ApiResponse<CategoryStatsResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_category_stats(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<CategoryStatsQuery>>,
) -> ApiResult<Json<ApiResponse<CategoryStatsResponse>>> {
    let period = DateWindow::or_month_to_date(query.start_date, query.end_date, today());
    debug!("Category {} stats for {} - {}", id, period.start_date, period.end_date);

    let stats = CategoryStore::new(&state.db)
        .stats(id, current.id(), period.start_date, period.end_date)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;

    Ok(Json(ApiResponse::ok(
        CategoryStatsResponse::new(id, stats, period),
        "Category statistics retrieved successfully",
    )))
}

/// Monthly usage of a category over the trailing months
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/usage",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID"), UsageQuery),
    responses(
        (status = 200, description = "Category usage retrieved successfully", body = ApiResponse<Vec<MonthlyUsageResponse>>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_category_usage(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<UsageQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MonthlyUsageResponse>>>> {
    let store = CategoryStore::new(&state.db);
    if !store.can_access(id, current.id()).await? {
        warn!("Category {} not accessible", id);
        return Err(ApiError::NotFound("Category"));
    }

    let usage = store
        .usage_over_time(id, current.id(), query.months.unwrap_or(12), today())
        .await?;
    Ok(Json(ApiResponse::ok(
        usage.into_iter().map(MonthlyUsageResponse::from).collect(),
        "Category usage retrieved successfully",
    )))
}
