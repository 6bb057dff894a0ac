//! Credential store abstraction
//!
//! The auth flow only needs a handful of account operations. They sit behind
//! [`CredentialStore`] so the same service runs against PostgreSQL in
//! production and an in-process store in development and tests.

use async_trait::async_trait;

use crate::core::auth::roles::Role;
use crate::core::db::DbError;
use crate::core::db::models::{NewAccount, RoleRecord, User, UserChanges, UserDetails};

/// Credential store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,

    #[error("DNI or email already registered")]
    DuplicateAccount,

    #[error("Role {0} is missing from the role table")]
    RoleNotFound(String),

    #[error("User {user_id} does not hold role {role_id}")]
    RoleNotAssigned { user_id: i64, role_id: i32 },

    #[error("User {0} would be left without a role")]
    LastRole(i64),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database setup error: {0}")]
    Setup(DbError),
}

impl StoreError {
    /// Map a driver error, turning uniqueness violations into `DuplicateAccount`
    pub fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateAccount
            }
            _ => StoreError::DatabaseError(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(e) => StoreError::DatabaseError(e),
            other => StoreError::Setup(other),
        }
    }
}

/// Account storage consulted by the auth flow
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account whose dni, or email when given, matches
    async fn find_by_dni_or_email(
        &self,
        dni: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Find an account by national id
    async fn find_by_dni(&self, dni: &str) -> Result<Option<User>, StoreError>;

    /// Find an account by id
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    /// Create the account, its details record and its initial role assignment
    /// as one unit. Uniqueness violations surface as `DuplicateAccount`.
    async fn create_account(&self, account: NewAccount) -> Result<User, StoreError>;

    /// Details record of an account, if one exists
    async fn details_for_user(&self, user_id: i64) -> Result<Option<UserDetails>, StoreError>;

    /// Canonical names of the roles currently assigned to an account
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError>;

    /// Apply `changes` and return the updated account. An email held by
    /// another account surfaces as `DuplicateAccount`.
    async fn update_user(&self, user_id: i64, changes: UserChanges) -> Result<User, StoreError>;

    /// Assign a role to an account; assigning a held role is a no-op
    async fn assign_role(&self, user_id: i64, role: Role) -> Result<(), StoreError>;

    /// Remove a role assignment. Refuses to remove the account's only role.
    async fn revoke_role(&self, user_id: i64, role_id: i32) -> Result<(), StoreError>;

    /// The role vocabulary
    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError>;

    /// Accounts ordered by id
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    /// Delete an account; returns whether it existed
    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError>;

    /// Cheap liveness probe
    async fn health_check(&self) -> Result<(), StoreError>;
}
