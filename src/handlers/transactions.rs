use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime};
use compute::TransactionStore;
use compute::transactions::{
    CategoryTotal, SortKey, SortOrder, TransactionFilter, TransactionInput, TransactionStats,
    TransactionView,
};
use model::entities::transaction::TransactionKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::categories::MonthlyUsageResponse;
use super::{parse_kind, today};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::schemas::{ApiResponse, AppState, DateWindow, ErrorResponse, Pagination};

/// Request body for creating or replacing a transaction
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct TransactionRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    /// Strictly positive, two decimal places
    #[schema(example = "12.50")]
    pub amount: Decimal,
    #[validate(range(min = 1))]
    pub category_id: i32,
    /// `expense` (default) or `income`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl TransactionRequest {
    fn into_input(self) -> ApiResult<TransactionInput> {
        let kind = match self.kind.as_deref() {
            Some(kind) => parse_kind(kind)?,
            None => TransactionKind::Expense,
        };
        Ok(TransactionInput {
            title: self.title.trim().to_string(),
            amount: self.amount,
            category_id: self.category_id,
            kind,
            description: self.description,
            date: self.date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub title: String,
    #[schema(example = "12.50")]
    pub amount: Decimal,
    pub category_id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub category_icon: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<TransactionView> for TransactionResponse {
    fn from(view: TransactionView) -> Self {
        let tx = view.transaction;
        Self {
            id: tx.id,
            title: tx.title,
            amount: tx.amount,
            category_id: tx.category_id,
            kind: tx.kind.as_str().to_string(),
            description: tx.description,
            date: tx.date,
            category_name: view.category_name,
            category_color: view.category_color,
            category_icon: view.category_icon,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

/// One page of a filtered transaction listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionPage {
    pub items: Vec<TransactionResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotalResponse {
    pub category_id: i32,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub transaction_count: u64,
    pub total_amount: Decimal,
}

impl From<CategoryTotal> for CategoryTotalResponse {
    fn from(total: CategoryTotal) -> Self {
        Self {
            category_id: total.category_id,
            name: total.name,
            color: total.color,
            icon: total.icon,
            transaction_count: total.transaction_count,
            total_amount: total.total_amount,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategorySummaryResponse {
    pub summary: Vec<CategoryTotalResponse>,
    pub period: DateWindow,
    /// `expense`, `income` or `all`
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatsResponse {
    /// Sum of expenses in the period
    pub total_expenses: Decimal,
    pub total_transactions: u64,
    pub category_summary: Vec<CategoryTotalResponse>,
    /// Last six months, most recent first
    pub monthly_trends: Vec<MonthlyUsageResponse>,
    pub period: DateWindow,
}

impl From<TransactionStats> for TransactionStatsResponse {
    fn from(stats: TransactionStats) -> Self {
        Self {
            total_expenses: stats.total_expenses,
            total_transactions: stats.total_transactions,
            category_summary: stats
                .category_summary
                .into_iter()
                .map(CategoryTotalResponse::from)
                .collect(),
            monthly_trends: stats
                .monthly_trends
                .into_iter()
                .map(MonthlyUsageResponse::from)
                .collect(),
            period: DateWindow {
                start_date: stats.start_date,
                end_date: stats.end_date,
            },
        }
    }
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct TransactionQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    /// Page size (default: 50)
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// `expense` or `income`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Case-insensitive match on title or description
    #[validate(length(max = 100))]
    pub search: Option<String>,
    /// `date` (default), `amount`, `title` or `created_at`
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default)
    pub sort_order: Option<String>,
}

impl TransactionQuery {
    fn to_filter(&self, page: u64, limit: u64) -> ApiResult<TransactionFilter> {
        Ok(TransactionFilter {
            kind: self.kind.as_deref().map(parse_kind).transpose()?,
            category_id: self.category_id,
            start_date: self.start_date,
            end_date: self.end_date,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            sort_by: self
                .sort_by
                .as_deref()
                .map(str::parse::<SortKey>)
                .transpose()
                .map_err(ApiError::BadRequest)?
                .unwrap_or_default(),
            sort_order: self
                .sort_order
                .as_deref()
                .map(str::parse::<SortOrder>)
                .transpose()
                .map_err(ApiError::BadRequest)?
                .unwrap_or_default(),
            limit: Some(limit),
            offset: Some(Pagination::offset(page, limit)),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct RecentQuery {
    /// Number of transactions (default: 10)
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

/// Date window, defaulting to the current month up to today
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct PeriodQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct CategorySummaryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `expense` or `income`; both when omitted
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct TrendsQuery {
    /// Trailing months to cover (default: 12)
    #[validate(range(min = 1, max = 120))]
    pub months: Option<u32>,
}

/// Record an expense or income
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request or category", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<TransactionRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TransactionResponse>>)> {
    trace!("Entering create_transaction function");
    debug!("Creating transaction: {} ({})", request.title, request.amount);

    let view = TransactionStore::new(&state.db)
        .create(current.id(), request.into_input()?)
        .await?;

    info!("Created transaction {}", view.transaction.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(view.into(), "Transaction created successfully")),
    ))
}

/// List transactions with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<TransactionPage>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_transactions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<TransactionQuery>>,
) -> ApiResult<Json<ApiResponse<TransactionPage>>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(50);
    debug!("Fetching transactions - page: {}, limit: {}", page, limit);

    let filter = query.to_filter(page, limit)?;
    let store = TransactionStore::new(&state.db);
    let items = store.list_for_user(current.id(), &filter).await?;
    let total_count = store.count(current.id(), &filter).await?;

    Ok(Json(ApiResponse::ok(
        TransactionPage {
            items: items.into_iter().map(TransactionResponse::from).collect(),
            pagination: Pagination::new(page, limit, total_count),
        },
        "Transactions retrieved successfully",
    )))
}

/// Most recently recorded transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions/recent",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(RecentQuery),
    responses(
        (status = 200, description = "Recent transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_recent_transactions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<RecentQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<TransactionResponse>>>> {
    let recent = TransactionStore::new(&state.db)
        .recent(current.id(), query.limit.unwrap_or(10))
        .await?;
    Ok(Json(ApiResponse::ok(
        recent.into_iter().map(TransactionResponse::from).collect(),
        "Recent transactions retrieved successfully",
    )))
}

/// Expense overview for a period with six months of trends
#[utoipa::path(
    get,
    path = "/api/v1/transactions/stats",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(PeriodQuery),
    responses(
        (status = 200, description = "Transaction statistics retrieved successfully", body = ApiResponse<TransactionStatsResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_transaction_stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<TransactionStatsResponse>>> {
    let today = today();
    let period = DateWindow::or_month_to_date(query.start_date, query.end_date, today);
    let stats = TransactionStore::new(&state.db)
        .stats(current.id(), period.start_date, period.end_date, today)
        .await?;
    Ok(Json(ApiResponse::ok(
        stats.into(),
        "Transaction statistics retrieved successfully",
    )))
}

/// Totals per category for a period
#[utoipa::path(
    get,
    path = "/api/v1/transactions/summary/category",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(CategorySummaryQuery),
    responses(
        (status = 200, description = "Category summary retrieved successfully", body = ApiResponse<CategorySummaryResponse>),
        (status = 400, description = "Invalid type", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_category_summary(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<CategorySummaryQuery>>,
) -> ApiResult<Json<ApiResponse<CategorySummaryResponse>>> {
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    let period = DateWindow::or_month_to_date(query.start_date, query.end_date, today());

    let summary = TransactionStore::new(&state.db)
        .summary_by_category(current.id(), period.start_date, period.end_date, kind)
        .await?;
    Ok(Json(ApiResponse::ok(
        CategorySummaryResponse {
            summary: summary.into_iter().map(CategoryTotalResponse::from).collect(),
            period,
            kind: kind.map_or("all", |k| k.as_str()).to_string(),
        },
        "Category summary retrieved successfully",
    )))
}

/// Monthly totals per kind over the trailing months
#[utoipa::path(
    get,
    path = "/api/v1/transactions/trends/monthly",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TrendsQuery),
    responses(
        (status = 200, description = "Monthly trends retrieved successfully", body = ApiResponse<Vec<MonthlyUsageResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_monthly_trends(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Query(query)): Valid<Query<TrendsQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MonthlyUsageResponse>>>> {
    let trends = TransactionStore::new(&state.db)
        .monthly_trends(current.id(), query.months.unwrap_or(12), today())
        .await?;
    Ok(Json(ApiResponse::ok(
        trends.into_iter().map(MonthlyUsageResponse::from).collect(),
        "Monthly trends retrieved successfully",
    )))
}

/// Get a single transaction
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn get_transaction(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    let Some(view) = TransactionStore::new(&state.db)
        .find_by_id(id, current.id())
        .await?
    else {
        warn!("Transaction {} not found", id);
        return Err(ApiError::NotFound("Transaction"));
    };
    Ok(Json(ApiResponse::ok(view.into(), "Transaction retrieved successfully")))
}

/// Replace a transaction
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request or category", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current, request), fields(user_id = current.id()))]
pub async fn update_transaction(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<TransactionRequest>>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    let store = TransactionStore::new(&state.db);
    if !store.update(id, current.id(), request.into_input()?).await? {
        warn!("Transaction {} not found for update", id);
        return Err(ApiError::NotFound("Transaction"));
    }

    let view = store
        .find_by_id(id, current.id())
        .await?
        .ok_or(ApiError::NotFound("Transaction"))?;
    info!("Updated transaction {}", id);
    Ok(Json(ApiResponse::ok(view.into(), "Transaction updated successfully")))
}

/// Delete a transaction
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(user_id = current.id()))]
pub async fn delete_transaction(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<String>>> {
    if !TransactionStore::new(&state.db).delete(id, current.id()).await? {
        warn!("Transaction {} not found for deletion", id);
        return Err(ApiError::NotFound("Transaction"));
    }
    info!("Deleted transaction {}", id);
    Ok(Json(ApiResponse::ok(
        format!("Transaction {} deleted", id),
        "Transaction deleted successfully",
    )))
}
