//! User administration
//!
//! Role-gated routes over the credential store: listing, lookup, deletion and
//! role grants.

pub mod api;

pub use api::{UsersApiError, UsersApiState, users_api_router};
