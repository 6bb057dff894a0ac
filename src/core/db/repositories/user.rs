//! PostgreSQL user repository
//!
//! Accounts, details and role assignments backed by SQLx. Passwords arrive
//! already hashed; this layer never handles plaintext.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::auth::roles::Role;
use crate::core::db::models::{NewAccount, RoleRecord, User, UserChanges, UserDetails};
use crate::core::db::pool;
use crate::core::db::store::{CredentialStore, StoreError};

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_role(
        executor: impl sqlx::PgExecutor<'_>,
        role: Role,
    ) -> Result<RoleRecord, StoreError> {
        sqlx::query_as::<_, RoleRecord>(
            r#"
            SELECT role_id, role_name
            FROM roles
            WHERE LOWER(role_name) = LOWER($1)
            "#,
        )
        .bind(role.as_str())
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| StoreError::RoleNotFound(role.to_string()))
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn find_by_dni_or_email(
        &self,
        dni: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, name, dni, email, password_hash, created_at
            FROM users
            WHERE dni = $1 OR ($2::TEXT IS NOT NULL AND email = $2)
            LIMIT 1
            "#,
        )
        .bind(dni)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_dni(&self, dni: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, name, dni, email, password_hash, created_at
            FROM users
            WHERE dni = $1
            "#,
        )
        .bind(dni)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, name, dni, email, password_hash, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_account(&self, account: NewAccount) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let role = Self::find_role(&mut *tx, account.role).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, dni, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, name, dni, email, password_hash, created_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.dni)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_insert)?;

        sqlx::query(
            r#"
            INSERT INTO users_details
                (user_id, date_of_birth, contact_info, specialty, availability)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.user_id)
        .bind(account.details.date_of_birth)
        .bind(&account.details.contact_info)
        .bind(&account.details.specialty)
        .bind(&account.details.availability)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user.user_id)
            .bind(role.role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn details_for_user(&self, user_id: i64) -> Result<Option<UserDetails>, StoreError> {
        let details = sqlx::query_as::<_, UserDetails>(
            r#"
            SELECT user_id, date_of_birth, contact_info, specialty, availability
            FROM users_details
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let roles: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.role_name
            FROM user_roles ur
            JOIN roles r ON r.role_id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.role_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles.into_iter().map(|(name,)| name).collect())
    }

    async fn update_user(&self, user_id: i64, changes: UserChanges) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash)
            WHERE user_id = $1
            RETURNING user_id, name, dni, email, password_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_insert)?
        .ok_or(StoreError::NotFound)
    }

    async fn assign_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        if self.find_by_id(user_id).await?.is_none() {
            return Err(StoreError::NotFound);
        }

        let role = Self::find_role(&self.pool, role).await?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_role(&self, user_id: i64, role_id: i32) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent revocations for the same account
        let locked = sqlx::query("SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound);
        }

        let held: Vec<(i32,)> = sqlx::query_as("SELECT role_id FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        if !held.iter().any(|(id,)| *id == role_id) {
            return Err(StoreError::RoleNotAssigned { user_id, role_id });
        }
        if held.len() == 1 {
            return Err(StoreError::LastRole(user_id));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError> {
        let roles = sqlx::query_as::<_, RoleRecord>(
            "SELECT role_id, role_name FROM roles ORDER BY role_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, name, dni, email, password_hash, created_at
            FROM users
            ORDER BY user_id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }
}
