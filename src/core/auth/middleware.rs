//! Session authentication and role authorization middleware
//!
//! Protected routers are wrapped in two layers:
//!
//! ```ignore
//! Router::new()
//!     .route(
//!         "/api/users",
//!         get(list_users).route_layer(from_fn_with_state(
//!             AllowedRoles::new(["Doctor", "Admin"]),
//!             authorize,
//!         )),
//!     )
//!     .route_layer(from_fn_with_state(jwt_service, authenticate))
//! ```
//!
//! [`authenticate`] verifies the bearer token and stores an [`AuthContext`] in
//! the request extensions; [`authorize`] intersects the context's role
//! snapshot with the route's [`AllowedRoles`]. Neither touches the database.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::auth::jwt::{JwtError, JwtService};
use crate::core::auth::roles::{Role, normalize_role_name};
use crate::core::auth::service::AuthError;

/// Identity of the caller, taken from a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    /// Role names captured when the token was issued
    pub roles: Vec<String>,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Verify the bearer token and attach the caller's [`AuthContext`]
pub async fn authenticate(
    State(jwt_service): State<JwtService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = jwt_service.verify(token).map_err(|e| {
        tracing::debug!("Session token rejected: {}", e);
        match e {
            JwtError::Expired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    })?;

    let context = AuthContext {
        user_id: claims.user_id()?,
        roles: claims.roles,
        issued_at: claims.iat,
        expires_at: claims.exp,
    };

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Set of role names a route accepts, compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(Arc<BTreeSet<String>>);

impl AllowedRoles {
    /// Build from any collection of role names (array, slice, `Vec`, set)
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(Arc::new(
            roles
                .into_iter()
                .map(|r| normalize_role_name(r.as_ref()))
                .filter(|r| !r.is_empty())
                .collect(),
        ))
    }

    /// Build from typed roles
    pub fn any_of(roles: &[Role]) -> Self {
        Self::new(roles.iter().map(Role::as_str))
    }

    /// Whether any of `user_roles` is in the set. An empty set admits nobody.
    pub fn permits<S: AsRef<str>>(&self, user_roles: &[S]) -> bool {
        user_roles
            .iter()
            .any(|r| self.0.contains(&normalize_role_name(r.as_ref())))
    }

    /// Authorization decision for a request context
    pub fn check(&self, context: Option<&AuthContext>) -> Result<(), AuthError> {
        let context = context.ok_or(AuthError::Unauthenticated)?;

        if self.permits(context.roles.as_slice()) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Admit the request only if the caller holds one of the allowed roles.
///
/// Must run inside [`authenticate`]; a request without an [`AuthContext`] is
/// rejected as unauthenticated.
pub async fn authorize(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = request.extensions().get::<AuthContext>();

    if let Err(e) = allowed.check(context) {
        tracing::info!(
            user_id = context.map(|c| c.user_id),
            method = %request.method(),
            path = %request.uri().path(),
            "Access denied: {}",
            e
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
