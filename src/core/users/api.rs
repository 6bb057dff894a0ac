//! User administration API endpoints
//!
//! Every route requires a session token; each one is gated by role:
//! - GET /api/users - List users (Doctor, Admin)
//! - GET /api/users/{id} - Get user with roles (Admin)
//! - PUT /api/users/{id} - Update name, email or password (Admin)
//! - DELETE /api/users/{id} - Delete user (Admin)
//! - GET /api/roles - List the role vocabulary (any role)
//! - POST /api/user-roles - Grant a role to a user (Admin)
//! - DELETE /api/user-roles/{user_id}/{role_id} - Revoke a role (Admin)

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::{from_fn_with_state, map_response_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::auth::api::{ApiError, internal_error_response, reveal_internal_errors};
use crate::core::auth::jwt::JwtService;
use crate::core::auth::middleware::{AllowedRoles, AuthContext, authenticate, authorize};
use crate::core::auth::password::PasswordHasher;
use crate::core::auth::roles::Role;
use crate::core::auth::service::AuthService;
use crate::core::db::models::{RoleRecord, UserChanges, UserProfile, UserResponse};
use crate::core::db::store::{CredentialStore, StoreError};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Users API state containing the credential store, hasher and JWT service
#[derive(Clone)]
pub struct UsersApiState {
    pub store: Arc<dyn CredentialStore>,
    pub hasher: PasswordHasher,
    pub jwt_service: JwtService,
    /// Put internal error details in 500 bodies (development only)
    pub expose_internal_errors: bool,
}

/// Users API error types
#[derive(Debug, thiserror::Error)]
pub enum UsersApiError {
    #[error("User not found")]
    NotFound,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Email already in use")]
    EmailTaken,

    #[error("User does not hold that role")]
    RoleNotAssigned,

    #[error("Cannot remove the user's last role")]
    LastRole,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for UsersApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => UsersApiError::NotFound,
            StoreError::DuplicateAccount => UsersApiError::EmailTaken,
            StoreError::RoleNotAssigned { .. } => UsersApiError::RoleNotAssigned,
            StoreError::LastRole(_) => UsersApiError::LastRole,
            e => UsersApiError::InternalError(e.to_string()),
        }
    }
}

impl From<JsonRejection> for UsersApiError {
    fn from(rejection: JsonRejection) -> Self {
        UsersApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for UsersApiError {
    fn from(rejection: PathRejection) -> Self {
        UsersApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for UsersApiError {
    fn from(rejection: QueryRejection) -> Self {
        UsersApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for UsersApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            UsersApiError::NotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            UsersApiError::InvalidRole(_) => (StatusCode::BAD_REQUEST, "INVALID_ROLE"),
            UsersApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            UsersApiError::EmailTaken => (StatusCode::CONFLICT, "EMAIL_TAKEN"),
            UsersApiError::RoleNotAssigned => (StatusCode::NOT_FOUND, "ROLE_NOT_ASSIGNED"),
            UsersApiError::LastRole => (StatusCode::CONFLICT, "LAST_ROLE"),
            UsersApiError::InternalError(detail) => {
                return internal_error_response(detail.clone());
            }
        };

        (status, Json(ApiError::new(self.to_string(), code))).into_response()
    }
}

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    fn page(&self) -> Result<(i64, i64), UsersApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0);

        if limit < 1 || offset < 0 {
            return Err(UsersApiError::BadRequest(
                "limit must be positive and offset non-negative".to_string(),
            ));
        }

        Ok((limit.min(MAX_PAGE_SIZE), offset))
    }
}

/// Request for granting a role
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: i64,
    pub role: String,
}

/// Request for updating an account; omitted fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    /// Trim and validate the request. The password is returned separately,
    /// still in plaintext, for hashing.
    fn validate(self) -> Result<(UserChanges, Option<String>), UsersApiError> {
        let bad = |msg: &str| UsersApiError::BadRequest(msg.to_string());

        let name = self.name.map(|n| n.trim().to_string());
        if name.as_deref().is_some_and(str::is_empty) {
            return Err(bad("name must not be blank"));
        }

        let email = self.email.map(|e| e.trim().to_string());
        if let Some(email) = &email {
            AuthService::validate_email(email).map_err(|e| bad(&e.to_string()))?;
        }

        if let Some(password) = &self.password {
            if password.is_empty() {
                return Err(bad("password must not be empty"));
            }
            AuthService::validate_password(password).map_err(|e| bad(&e.to_string()))?;
        }

        let changes = UserChanges {
            name,
            email,
            password_hash: None,
        };
        if changes.is_empty() && self.password.is_none() {
            return Err(bad("nothing to update; send name, email or password"));
        }

        Ok((changes, self.password))
    }
}

/// Create the users API router
pub fn users_api_router(state: UsersApiState) -> Router {
    let jwt_service = state.jwt_service.clone();
    let expose_internal_errors = state.expose_internal_errors;
    let state = Arc::new(state);

    let staff = AllowedRoles::any_of(&[Role::Doctor, Role::Admin]);
    let admin = AllowedRoles::any_of(&[Role::Admin]);
    let anyone = AllowedRoles::any_of(&Role::ALL);

    Router::new()
        .route(
            "/api/users",
            get(list_users_handler).route_layer(from_fn_with_state(staff, authorize)),
        )
        .route(
            "/api/users/{id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler)
                .route_layer(from_fn_with_state(admin.clone(), authorize)),
        )
        .route(
            "/api/roles",
            get(list_roles_handler).route_layer(from_fn_with_state(anyone, authorize)),
        )
        .route(
            "/api/user-roles",
            post(assign_role_handler).route_layer(from_fn_with_state(admin.clone(), authorize)),
        )
        .route(
            "/api/user-roles/{user_id}/{role_id}",
            delete(revoke_role_handler).route_layer(from_fn_with_state(admin, authorize)),
        )
        .route_layer(from_fn_with_state(jwt_service, authenticate))
        .with_state(state)
        .layer(map_response_with_state(
            expose_internal_errors,
            reveal_internal_errors,
        ))
}

/// GET /api/users
/// List users in id order
async fn list_users_handler(
    State(state): State<Arc<UsersApiState>>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>, UsersApiError> {
    let Query(query) = query?;
    let (limit, offset) = query.page()?;

    let users = state.store.list_users(limit, offset).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{id}
/// Get a user and their current roles
async fn get_user_handler(
    State(state): State<Arc<UsersApiState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserProfile>, UsersApiError> {
    let Path(user_id) = id?;

    Ok(Json(load_profile(&state, user_id).await?))
}

/// PUT /api/users/{id}
/// Update a user's name, email or password; a new password is rehashed
async fn update_user_handler(
    State(state): State<Arc<UsersApiState>>,
    context: AuthContext,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, UsersApiError> {
    let Path(user_id) = id?;
    let Json(request) = payload?;

    let (mut changes, password) = request.validate()?;
    if let Some(password) = password {
        let hash = state
            .hasher
            .hash_async(&password)
            .await
            .map_err(|e| UsersApiError::InternalError(e.to_string()))?;
        changes.password_hash = Some(hash);
    }

    let password_changed = changes.password_hash.is_some();
    let user = state.store.update_user(user_id, changes).await?;
    let roles = state.store.roles_for_user(user_id).await?;

    tracing::info!(
        updated_by = context.user_id,
        password_changed,
        "User updated: {}",
        user_id
    );

    Ok(Json(UserProfile::new(user, roles)))
}

/// DELETE /api/users/{id}
/// Delete a user; credential, details and role assignments go with it
async fn delete_user_handler(
    State(state): State<Arc<UsersApiState>>,
    context: AuthContext,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, UsersApiError> {
    let Path(user_id) = id?;

    if !state.store.delete_user(user_id).await? {
        return Err(UsersApiError::NotFound);
    }

    tracing::info!(deleted_by = context.user_id, "User deleted: {}", user_id);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/roles
/// List the role vocabulary
async fn list_roles_handler(
    State(state): State<Arc<UsersApiState>>,
) -> Result<Json<Vec<RoleRecord>>, UsersApiError> {
    let roles = state.store.list_roles().await?;

    Ok(Json(roles))
}

/// POST /api/user-roles
/// Grant a role to a user; granting a role the user already holds is a no-op
async fn assign_role_handler(
    State(state): State<Arc<UsersApiState>>,
    context: AuthContext,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, UsersApiError> {
    let Json(request) = payload?;

    let role: Role = request
        .role
        .parse()
        .map_err(|_| UsersApiError::InvalidRole(request.role.clone()))?;

    state.store.assign_role(request.user_id, role).await?;

    tracing::info!(
        granted_by = context.user_id,
        "Role {} granted to user {}",
        role,
        request.user_id
    );

    Ok(Json(load_profile(&state, request.user_id).await?))
}

/// DELETE /api/user-roles/{user_id}/{role_id}
/// Revoke a role; an account always keeps at least one role
async fn revoke_role_handler(
    State(state): State<Arc<UsersApiState>>,
    context: AuthContext,
    ids: Result<Path<(i64, i32)>, PathRejection>,
) -> Result<Json<UserProfile>, UsersApiError> {
    let Path((user_id, role_id)) = ids?;

    state.store.revoke_role(user_id, role_id).await?;

    tracing::info!(
        revoked_by = context.user_id,
        "Role {} revoked from user {}",
        role_id,
        user_id
    );

    Ok(Json(load_profile(&state, user_id).await?))
}

async fn load_profile(state: &UsersApiState, user_id: i64) -> Result<UserProfile, UsersApiError> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(UsersApiError::NotFound)?;
    let roles = state.store.roles_for_user(user_id).await?;

    Ok(UserProfile::new(user, roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::JwtConfig;
    use crate::core::db::MemoryUserRepository;
    use crate::core::db::models::{NewAccount, NewUserDetails};
    use axum::{
        body::Body,
        http::{Method, Request, header},
    };
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        store: Arc<MemoryUserRepository>,
        jwt: JwtService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryUserRepository::new());
        let jwt = JwtService::new(JwtConfig::new("users_api_test_secret"));
        let app = users_api_router(UsersApiState {
            store: store.clone(),
            hasher: PasswordHasher::new(4),
            jwt_service: jwt.clone(),
            expose_internal_errors: false,
        });
        Fixture { app, store, jwt }
    }

    async fn create_user(store: &MemoryUserRepository, dni: &str, role: Role) -> i64 {
        store
            .create_account(NewAccount {
                name: format!("User {dni}"),
                dni: dni.to_string(),
                email: None,
                password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholder00".to_string(),
                role,
                details: NewUserDetails::default(),
            })
            .await
            .unwrap()
            .user_id
    }

    impl Fixture {
        fn token_for(&self, user_id: i64, role: Role) -> String {
            self.jwt
                .issue(user_id, &[role.to_string()])
                .unwrap()
                .token
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }
    }

    #[test]
    fn test_page_defaults_and_clamp() {
        assert_eq!(ListUsersQuery::default().page().unwrap(), (50, 0));

        let query = ListUsersQuery {
            limit: Some(1000),
            offset: Some(10),
        };
        assert_eq!(query.page().unwrap(), (MAX_PAGE_SIZE, 10));

        let query = ListUsersQuery {
            limit: Some(0),
            offset: None,
        };
        assert!(matches!(query.page(), Err(UsersApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_list_users_requires_token() {
        let f = fixture();

        let (status, body) = f.send(Method::GET, "/api/users", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "NO_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_list_users_by_role() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let doctor = create_user(&f.store, "200", Role::Doctor).await;

        let (status, body) = f
            .send(
                Method::GET,
                "/api/users",
                Some(&f.token_for(patient, Role::Patient)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = f
            .send(
                Method::GET,
                "/api/users",
                Some(&f.token_for(doctor, Role::Doctor)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn test_get_user_admin_only() {
        let f = fixture();
        let doctor = create_user(&f.store, "200", Role::Doctor).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;

        let uri = format!("/api/users/{doctor}");

        let (status, _) = f
            .send(Method::GET, &uri, Some(&f.token_for(doctor, Role::Doctor)), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = f
            .send(Method::GET, &uri, Some(&f.token_for(admin, Role::Admin)), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dni"], "200");
        assert_eq!(body["roles"], serde_json::json!(["Doctor"]));
    }

    #[tokio::test]
    async fn test_get_user_not_found_and_bad_id() {
        let f = fixture();
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);

        let (status, body) = f.send(Method::GET, "/api/users/9999", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");

        let (status, body) = f.send(Method::GET, "/api/users/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_delete_user() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);
        let uri = format!("/api/users/{patient}");

        let (status, _) = f.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(f.store.find_by_id(patient).await.unwrap().is_none());

        let (status, _) = f.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_roles_any_authenticated_user() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;

        let (status, body) = f
            .send(
                Method::GET,
                "/api/roles",
                Some(&f.token_for(patient, Role::Patient)),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["role_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Patient", "Doctor", "Admin"]);
    }

    #[tokio::test]
    async fn test_assign_role() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);

        for _ in 0..2 {
            let (status, body) = f
                .send(
                    Method::POST,
                    "/api/user-roles",
                    Some(&token),
                    Some(serde_json::json!({ "user_id": patient, "role": "doctor" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["roles"], serde_json::json!(["Patient", "Doctor"]));
        }
    }

    #[tokio::test]
    async fn test_assign_role_errors() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);

        let (status, body) = f
            .send(
                Method::POST,
                "/api/user-roles",
                Some(&token),
                Some(serde_json::json!({ "user_id": patient, "role": "Nurse" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ROLE");

        let (status, body) = f
            .send(
                Method::POST,
                "/api/user-roles",
                Some(&token),
                Some(serde_json::json!({ "user_id": 9999, "role": "Doctor" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");

        let (status, _) = f
            .send(
                Method::POST,
                "/api/user-roles",
                Some(&f.token_for(patient, Role::Patient)),
                Some(serde_json::json!({ "user_id": patient, "role": "Admin" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_user() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let uri = format!("/api/users/{patient}");

        let (status, body) = f
            .send(
                Method::PUT,
                &uri,
                Some(&f.token_for(admin, Role::Admin)),
                Some(serde_json::json!({
                    "name": "  Ana Ruiz ",
                    "email": "ana@example.com",
                    "password": "new-password"
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ana Ruiz");
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["roles"], serde_json::json!(["Patient"]));
        assert!(body.get("password_hash").is_none());

        let stored = f.store.find_by_id(patient).await.unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$2"));
        assert!(PasswordHasher::new(4).verify("new-password", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_update_user_admin_only() {
        let f = fixture();
        let doctor = create_user(&f.store, "200", Role::Doctor).await;

        let (status, body) = f
            .send(
                Method::PUT,
                &format!("/api/users/{doctor}"),
                Some(&f.token_for(doctor, Role::Doctor)),
                Some(serde_json::json!({ "name": "Self Promoted" })),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(f.store.find_by_id(doctor).await.unwrap().unwrap().name, "User 200");
    }

    #[tokio::test]
    async fn test_update_user_email_taken() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);

        let (status, _) = f
            .send(
                Method::PUT,
                &format!("/api/users/{admin}"),
                Some(&token),
                Some(serde_json::json!({ "email": "taken@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = f
            .send(
                Method::PUT,
                &format!("/api/users/{patient}"),
                Some(&token),
                Some(serde_json::json!({ "email": "taken@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EMAIL_TAKEN");
        assert_eq!(body["error"], "Email already in use");
    }

    #[tokio::test]
    async fn test_update_user_rejects_bad_input() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);
        let uri = format!("/api/users/{patient}");

        let cases = [
            serde_json::json!({}),
            serde_json::json!({ "name": "   " }),
            serde_json::json!({ "email": "not-an-email" }),
            serde_json::json!({ "password": "" }),
            serde_json::json!({ "password": "x".repeat(73) }),
        ];
        for body in cases {
            let (status, response) = f
                .send(Method::PUT, &uri, Some(&token), Some(body.clone()))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response["code"], "BAD_REQUEST", "{body}");
        }

        let (status, body) = f
            .send(
                Method::PUT,
                "/api/users/9999",
                Some(&token),
                Some(serde_json::json!({ "name": "Nobody" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_revoke_role() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);
        f.store.assign_role(patient, Role::Doctor).await.unwrap();

        // Patient = 1, Doctor = 2
        let (status, body) = f
            .send(
                Method::DELETE,
                &format!("/api/user-roles/{patient}/1"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roles"], serde_json::json!(["Doctor"]));

        let (status, body) = f
            .send(
                Method::DELETE,
                &format!("/api/user-roles/{patient}/2"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "LAST_ROLE");
        assert_eq!(f.store.roles_for_user(patient).await.unwrap(), vec!["Doctor"]);
    }

    #[tokio::test]
    async fn test_revoke_role_errors() {
        let f = fixture();
        let patient = create_user(&f.store, "100", Role::Patient).await;
        let admin = create_user(&f.store, "300", Role::Admin).await;
        let token = f.token_for(admin, Role::Admin);

        let (status, body) = f
            .send(
                Method::DELETE,
                &format!("/api/user-roles/{patient}/3"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ROLE_NOT_ASSIGNED");

        let (status, body) = f
            .send(Method::DELETE, "/api/user-roles/9999/1", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");

        let (status, body) = f
            .send(Method::DELETE, "/api/user-roles/abc/1", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = f
            .send(
                Method::DELETE,
                &format!("/api/user-roles/{admin}/3"),
                Some(&f.token_for(patient, Role::Patient)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(f.store.roles_for_user(admin).await.unwrap(), vec!["Admin"]);
    }
}
