use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use compute::identity::{ProfileStats, Registration};
use model::entities::user;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    /// At least 6 characters
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 2, max = 50))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50))]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token delivered to the user after registration
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50))]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

/// Account deletion must be confirmed with the password
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of a user. Never carries credentials.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub created_at: NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_verified: model.is_verified,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserResponse,
    /// Only present when tokens are exposed (development)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub token_type: String,
    pub expires_at: NaiveDateTime,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileStatsResponse {
    pub total_transactions: u64,
    pub expense_count: u64,
    pub income_count: u64,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub active_budgets: u64,
    pub categories_available: u64,
}

impl From<ProfileStats> for ProfileStatsResponse {
    fn from(stats: ProfileStats) -> Self {
        Self {
            total_transactions: stats.total_transactions,
            expense_count: stats.expense_count,
            income_count: stats.income_count,
            total_spent: stats.total_spent,
            total_income: stats.total_income,
            active_budgets: stats.active_budgets,
            categories_available: stats.categories_available,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub stats: ProfileStatsResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordResponse {
    /// Only present when tokens are exposed (development) and the email is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid request or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    trace!("Entering register function");

    let registered = state
        .identity_service()
        .register(
            Registration {
                email: request.email,
                password: request.password,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            },
            now(),
        )
        .await?;

    let message = if registered.verification_token.is_some() {
        "User registered successfully. Please verify your email."
    } else {
        "User registered successfully"
    };
    let verification_token = registered
        .verification_token
        .filter(|_| state.config.expose_tokens);

    info!("Registered user {}", registered.user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RegisterResponse {
                user: registered.user.into(),
                verification_token,
            },
            message,
        )),
    ))
}

/// Verify an email address with the token issued at registration
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid or expired verification token", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<VerifyEmailRequest>>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .identity_service()
        .verify_email(&request.token, now())
        .await?;
    Ok(Json(ApiResponse::ok(user.into(), "Email verified successfully")))
}

/// Log in and obtain a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or unverified email", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    trace!("Entering login function");
    let session = state
        .identity_service()
        .login(&request.email, &request.password, now())
        .await?;

    Ok(Json(ApiResponse::ok(
        LoginResponse {
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
            user: session.user.into(),
        },
        "Login successful",
    )))
}

/// Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logout successful", body = ApiResponse<String>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let revoked = state.identity_service().logout(&current.token).await?;
    debug!("Session revoked: {}", revoked);
    Ok(Json(ApiResponse::ok(
        format!("User {} logged out", current.id()),
        "Logout successful",
    )))
}

/// Current user with account statistics
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<ProfileResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<ProfileResponse>>> {
    let stats = state.identity_service().profile_stats(current.id()).await?;
    Ok(Json(ApiResponse::ok(
        ProfileResponse {
            user: current.user.into(),
            stats: stats.into(),
        },
        "Profile retrieved successfully",
    )))
}

/// Update first and last name
#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<UpdateProfileRequest>>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .identity_service()
        .update_profile(
            current.id(),
            request.first_name.trim().to_string(),
            request.last_name.trim().to_string(),
            now(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(user.into(), "Profile updated successfully")))
}

/// Change the password of the current user
#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed successfully", body = ApiResponse<String>),
        (status = 400, description = "Current password is incorrect", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<ChangePasswordRequest>>,
) -> ApiResult<Json<ApiResponse<String>>> {
    state
        .identity_service()
        .change_password(
            current.id(),
            &request.current_password,
            &request.new_password,
            now(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("Password of user {} changed", current.id()),
        "Password changed successfully",
    )))
}

/// Request a password reset token
///
/// Always succeeds so that registered emails cannot be discovered.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset instructions sent if the email exists", body = ApiResponse<ForgotPasswordResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<ForgotPasswordRequest>>,
) -> ApiResult<Json<ApiResponse<ForgotPasswordResponse>>> {
    let token = state
        .identity_service()
        .request_password_reset(&request.email, now())
        .await?;

    let reset_token = token.filter(|_| state.config.expose_tokens);
    Ok(Json(ApiResponse::ok(
        ForgotPasswordResponse { reset_token },
        "If the email exists, password reset instructions have been sent",
    )))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset successfully", body = ApiResponse<String>),
        (status = 400, description = "Invalid or expired reset token", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<ResetPasswordRequest>>,
) -> ApiResult<Json<ApiResponse<String>>> {
    state
        .identity_service()
        .reset_password(&request.token, &request.new_password, now())
        .await?;
    Ok(Json(ApiResponse::ok(
        "Password reset".to_string(),
        "Password reset successfully",
    )))
}

/// Delete the current user and everything they own
#[utoipa::path(
    delete,
    path = "/api/v1/auth/account",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted successfully", body = ApiResponse<String>),
        (status = 400, description = "Password is incorrect", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = current.id()))]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Valid(Json(request)): Valid<Json<DeleteAccountRequest>>,
) -> ApiResult<Json<ApiResponse<String>>> {
    state
        .identity_service()
        .delete_account(current.id(), &request.password)
        .await
        .inspect_err(|e| warn!("Account deletion refused: {}", e))?;

    info!("Account {} deleted", current.id());
    Ok(Json(ApiResponse::ok(
        format!("User {} deleted", current.id()),
        "Account deleted successfully",
    )))
}
