//! Database models
//!
//! Row structs for the `users`, `users_details`, `roles` and `user_roles` tables,
//! plus the public projections returned by the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::auth::roles::Role;

// ============================================================================
// User Model
// ============================================================================

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub dni: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Optional profile data stored alongside an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserDetails {
    pub user_id: i64,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_info: Option<String>,
    pub specialty: Option<String>,
    pub availability: Option<String>,
}

/// Profile data supplied at registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserDetails {
    pub date_of_birth: Option<NaiveDate>,
    pub contact_info: Option<String>,
    pub specialty: Option<String>,
    pub availability: Option<String>,
}

/// Everything needed to create an account in one step
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub dni: String,
    pub email: Option<String>,
    /// Already hashed; the store never sees a plaintext password
    pub password_hash: String,
    pub role: Role,
    pub details: NewUserDetails,
}

/// Fields an administrator may change on an existing account; `None` keeps the
/// stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Already hashed
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

// ============================================================================
// Role Model
// ============================================================================

/// Row of the `roles` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleRecord {
    pub role_id: i32,
    pub role_name: String,
}

// ============================================================================
// Projections
// ============================================================================

/// User without sensitive data (for API responses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub name: String,
    pub dni: String,
    pub email: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            dni: user.dni,
            email: user.email,
        }
    }
}

/// User projection with the user's current role names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserResponse,
    pub roles: Vec<String>,
}

impl UserProfile {
    pub fn new(user: User, roles: Vec<String>) -> Self {
        Self {
            user: user.into(),
            roles,
        }
    }
}
