//! Database module
//!
//! Connection pool, row models, the credential store trait and its
//! PostgreSQL and in-memory implementations.

pub mod models;
pub mod pool;
pub mod repositories;
pub mod store;

// Re-export commonly used items
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations};
pub use repositories::{MemoryUserRepository, UserRepository};
pub use store::{CredentialStore, StoreError};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
