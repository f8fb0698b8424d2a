//! Bearer-token authentication for the protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use compute::ComputeError;
use model::entities::user;
use tracing::{debug, trace};

use crate::error::ApiError;
use crate::schemas::AppState;

/// The authenticated caller, inserted into request extensions by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: user::Model,
    /// The raw bearer token, kept so logout can revoke it.
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Resolves `Authorization: Bearer <token>` to a user before the handler runs.
pub async fn require_user(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    trace!("Authenticating {} {}", request.method(), request.uri().path());

    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        debug!("Missing bearer token");
        return ApiError::from(ComputeError::Unauthorized("Access token required".to_string()))
            .into_response();
    };

    let token = bearer.token().to_string();
    let now = Utc::now().naive_utc();
    match state.identity_service().resolve(&token, now).await {
        Ok(user) => {
            trace!("Authenticated user {}", user.id);
            request.extensions_mut().insert(CurrentUser { user, token });
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
