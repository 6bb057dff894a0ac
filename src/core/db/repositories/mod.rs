//! Database repositories
//!
//! Implementations of [`CredentialStore`](crate::core::db::store::CredentialStore).

pub mod memory;
pub mod user;

pub use memory::MemoryUserRepository;
pub use user::UserRepository;
