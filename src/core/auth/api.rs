//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /api/auth/register - Register a new user
//! - POST /api/auth/login - Login and get a session token
//! - GET /api/auth/profile - Get the caller's profile (Bearer token)

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{from_fn_with_state, map_response_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::auth::middleware::{AuthContext, authenticate};
use crate::core::auth::service::{
    AuthError, AuthService, LoginRequest, LoginResponse, RegisterRequest, RegisteredUser,
};
use crate::core::db::models::UserProfile;

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
    /// Put internal error details in 500 bodies (development only)
    pub expose_internal_errors: bool,
}

/// Detail of a 500, attached to the response for [`reveal_internal_errors`]
#[derive(Debug, Clone)]
pub(crate) struct InternalErrorDetail(pub(crate) String);

/// Generic 500 body; the detail is logged and kept in the response extensions
pub(crate) fn internal_error_response(detail: String) -> Response {
    tracing::error!("Internal error: {}", detail);

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error", "INTERNAL_ERROR")),
    )
        .into_response();
    response.extensions_mut().insert(InternalErrorDetail(detail));
    response
}

/// Response mapper that swaps the generic 500 body for the detailed one when enabled
pub(crate) async fn reveal_internal_errors(
    State(expose): State<bool>,
    response: Response,
) -> Response {
    if !expose {
        return response;
    }

    match response.extensions().get::<InternalErrorDetail>() {
        Some(InternalErrorDetail(detail)) => {
            let body = ApiError::new(format!("Internal error: {detail}"), "INTERNAL_ERROR");
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingFields(_)
            | AuthError::InvalidRole(_)
            | AuthError::InvalidEmail
            | AuthError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyRegistered => StatusCode::CONFLICT,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields(_) => "MISSING_FIELDS",
            AuthError::InvalidRole(_) => "INVALID_ROLE",
            AuthError::InvalidEmail => "INVALID_EMAIL",
            AuthError::InvalidField { .. } => "INVALID_FIELD",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingCredential => "NO_CREDENTIAL",
            AuthError::MalformedCredential => "MALFORMED_CREDENTIAL",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::AlreadyRegistered => "ALREADY_REGISTERED",
            AuthError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::InternalError(detail) = self {
            return internal_error_response(detail);
        }

        let body = ApiError::new(self.to_string(), self.code());

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidField {
            field: "body",
            reason: rejection.body_text(),
        }
    }
}

/// Response for successful registration
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let jwt_service = state.auth_service.jwt_service().clone();
    let expose_internal_errors = state.expose_internal_errors;
    let state = Arc::new(state);

    let protected = Router::new()
        .route("/api/auth/profile", get(profile_handler))
        .route_layer(from_fn_with_state(jwt_service, authenticate));

    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .merge(protected)
        .with_state(state)
        .layer(map_response_with_state(
            expose_internal_errors,
            reveal_internal_errors,
        ))
}

/// POST /api/auth/register
/// Register a new user
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    let Json(request) = payload?;

    tracing::debug!("Registration attempt");

    let user = state.auth_service.register(request).await?;

    tracing::info!("User registered successfully: {}", user.user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

/// POST /api/auth/login
/// Login and get a session token
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(request) = payload?;

    tracing::debug!("Login attempt");

    let response = state.auth_service.login(request).await?;

    tracing::info!("User logged in successfully: {}", response.user.user.user_id);

    Ok(Json(response))
}

/// GET /api/auth/profile
/// Current identity and roles of the token's subject
async fn profile_handler(
    State(state): State<Arc<AuthApiState>>,
    context: AuthContext,
) -> Result<Json<UserProfile>, AuthError> {
    let profile = state.auth_service.profile(context.user_id).await?;

    Ok(Json(profile))
}
