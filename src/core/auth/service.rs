//! Authentication service
//!
//! Registration, login and profile lookup. Coordinates the credential store,
//! the password hasher and the JWT service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::auth::jwt::{JwtError, JwtService};
use crate::core::auth::password::{HashError, MAX_PASSWORD_BYTES, PasswordHasher};
use crate::core::auth::roles::Role;
use crate::core::db::models::{NewAccount, NewUserDetails, UserProfile};
use crate::core::db::store::{CredentialStore, StoreError};

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid value for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No credential supplied")]
    MissingCredential,

    #[error("Malformed credential")]
    MalformedCredential,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: insufficient role")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("DNI or email already registered")]
    AlreadyRegistered,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::UserNotFound,
            StoreError::DuplicateAccount => AuthError::AlreadyRegistered,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::InvalidToken => AuthError::InvalidToken,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

/// Registration request data
///
/// Every field is optional at the wire level so that missing fields are
/// reported together instead of failing JSON extraction on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

/// Login request data
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Account created by registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user_id: i64,
    pub name: String,
    pub dni: String,
    pub email: Option<String>,
    pub role: String,
}

/// Successful login: session token plus the user's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserProfile,
}

/// Trimmed value of an optional field, `None` when absent or blank
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Owned variant of [`present`]
fn present_owned(value: Option<String>) -> Option<String> {
    present(&value).map(str::to_string)
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    jwt_service: JwtService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt_service,
        }
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Validate email format
    pub(crate) fn validate_email(email: &str) -> Result<(), AuthError> {
        let mut parts = email.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AuthError::InvalidEmail);
        };

        if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidEmail);
        }

        // Domain needs at least one dot and no empty labels
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(())
    }

    /// Reject passwords bcrypt would truncate
    pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::InvalidField {
                field: "password",
                reason: format!("must be at most {MAX_PASSWORD_BYTES} bytes"),
            });
        }

        Ok(())
    }

    /// Resolve the requested registration role; absent means Patient
    fn resolve_registration_role(requested: Option<&str>) -> Result<Role, AuthError> {
        let Some(requested) = requested else {
            return Ok(Role::Patient);
        };

        match requested.parse::<Role>() {
            Ok(role) if role.is_self_assignable() => Ok(role),
            _ => Err(AuthError::InvalidRole(requested.to_string())),
        }
    }

    fn parse_date_of_birth(value: Option<&str>) -> Result<Option<NaiveDate>, AuthError> {
        value
            .map(|v| {
                NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| AuthError::InvalidField {
                    field: "date_of_birth",
                    reason: "expected YYYY-MM-DD".to_string(),
                })
            })
            .transpose()
    }

    /// Register a new account
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredUser, AuthError> {
        let name = present(&request.name);
        let dni = present(&request.dni);
        // Passwords are taken verbatim; only emptiness counts as missing
        let password = request.password.as_deref().filter(|p| !p.is_empty());

        let (Some(name), Some(dni), Some(password)) = (name, dni, password) else {
            let missing = [
                ("name", name.is_none()),
                ("dni", dni.is_none()),
                ("password", password.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
            return Err(AuthError::MissingFields(missing));
        };

        // Everything the caller controls is validated before touching the store
        let role = Self::resolve_registration_role(present(&request.role))?;
        let email = present(&request.email);
        if let Some(email) = email {
            Self::validate_email(email)?;
        }
        let date_of_birth = Self::parse_date_of_birth(present(&request.date_of_birth))?;
        Self::validate_password(password)?;

        // Fast path; the store's uniqueness constraint is the real guard
        if self.store.find_by_dni_or_email(dni, email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = self.hasher.hash_async(password).await?;

        let account = NewAccount {
            name: name.to_string(),
            dni: dni.to_string(),
            email: email.map(str::to_string),
            password_hash,
            role,
            details: NewUserDetails {
                date_of_birth,
                contact_info: present_owned(request.contact_info),
                specialty: present_owned(request.specialty),
                availability: present_owned(request.availability),
            },
        };

        let user = self.store.create_account(account).await?;

        tracing::debug!(user_id = user.user_id, %role, "Account created");

        Ok(RegisteredUser {
            user_id: user.user_id,
            name: user.name,
            dni: user.dni,
            email: user.email,
            role: role.to_string(),
        })
    }

    /// Login with national id and password
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let dni = present(&request.dni);
        let password = request.password.as_deref().filter(|p| !p.is_empty());

        let (Some(dni), Some(password)) = (dni, password) else {
            let missing = [("dni", dni.is_none()), ("password", password.is_none())]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
            return Err(AuthError::MissingFields(missing));
        };

        // Unknown dni and wrong password are indistinguishable to the caller
        let user = self
            .store
            .find_by_dni(dni)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .hasher
            .verify_async(password, &user.password_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let roles = self.store.roles_for_user(user.user_id).await?;
        let session = self.jwt_service.issue(user.user_id, &roles)?;

        Ok(LoginResponse {
            token: session.token,
            expires_at: session.expires_at,
            user: UserProfile::new(user, roles),
        })
    }

    /// Current profile of an account, read fresh from the store
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let roles = self.store.roles_for_user(user_id).await?;

        Ok(UserProfile::new(user, roles))
    }
}
