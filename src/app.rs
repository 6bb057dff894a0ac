//! HTTP application assembly
//!
//! Merges the feature routers, adds the root banner, the health check, a JSON
//! 404 fallback, CORS for the admin frontend and request tracing.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header, header::InvalidHeaderValue},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::auth::api::ApiError;
use crate::core::auth::{AuthApiState, AuthService, JwtService, PasswordHasher, auth_api_router};
use crate::core::config::Config;
use crate::core::db::CredentialStore;
use crate::core::users::{UsersApiState, users_api_router};

/// Services shared by every router
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn CredentialStore>,
    pub hasher: PasswordHasher,
    pub jwt_service: JwtService,
    pub expose_internal_errors: bool,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt_service,
            expose_internal_errors: false,
        }
    }

    /// Put internal error details in 500 bodies
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Build the services for a loaded configuration
    pub fn from_config(store: Arc<dyn CredentialStore>, config: &Config) -> Self {
        Self::new(
            store,
            PasswordHasher::new(config.bcrypt_cost),
            JwtService::new(config.jwt.clone()),
        )
        .expose_internal_errors(config.is_development())
    }
}

/// Build the complete application router
pub fn build_router(
    services: AppServices,
    frontend_url: &str,
) -> Result<Router, InvalidHeaderValue> {
    let cors = CorsLayer::new()
        .allow_origin(frontend_url.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let auth_service = AuthService::new(
        services.store.clone(),
        services.hasher,
        services.jwt_service.clone(),
    );

    let auth_api = auth_api_router(AuthApiState {
        auth_service,
        expose_internal_errors: services.expose_internal_errors,
    });
    let users_api = users_api_router(UsersApiState {
        store: services.store.clone(),
        hasher: services.hasher,
        jwt_service: services.jwt_service,
        expose_internal_errors: services.expose_internal_errors,
    });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler).with_state(services.store))
        .merge(auth_api)
        .merge(users_api)
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// GET /
async fn root_handler() -> &'static str {
    "Healthcare admin API is running"
}

/// GET /api/health
async fn health_handler(State(store): State<Arc<dyn CredentialStore>>) -> impl IntoResponse {
    match store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok" })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
        }
    }
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new("Not Found", "NOT_FOUND")),
    )
}
