use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use compute::{ComputeError, ConflictKind};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Failures a handler can return. Core errors map 1:1 onto statuses and codes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    /// Input that passed extraction but failed parsing in the handler.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message.clone(),
                None,
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", what),
                None,
            ),
            ApiError::Compute(err) => match err {
                ComputeError::Validation(message) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    message.clone(),
                    None,
                ),
                ComputeError::InvalidReference(_) => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_CATEGORY",
                    "Invalid category".to_string(),
                    None,
                ),
                ComputeError::Conflict(kind) => {
                    let code = match kind {
                        ConflictKind::DuplicateBudget => "DUPLICATE_BUDGET",
                        ConflictKind::DuplicateCategory => "DUPLICATE_CATEGORY",
                        ConflictKind::EmailTaken => "EMAIL_TAKEN",
                    };
                    (StatusCode::BAD_REQUEST, code, kind.to_string(), None)
                }
                ComputeError::HasTransactions {
                    category_id,
                    transaction_count,
                } => (
                    StatusCode::CONFLICT,
                    "CATEGORY_HAS_TRANSACTIONS",
                    "Cannot delete category that has transactions".to_string(),
                    Some(json!({
                        "category_id": category_id,
                        "transaction_count": transaction_count,
                    })),
                ),
                ComputeError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{} not found", what),
                    None,
                ),
                ComputeError::Unauthorized(message) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    message.clone(),
                    None,
                ),
                ComputeError::Database(_) | ComputeError::Credentials(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
            details,
        };
        (status, Json(body)).into_response()
    }
}
