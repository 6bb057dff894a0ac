//! MedAdmin - Healthcare administration API
//!
//! Authentication and authorization core for a healthcare admin backend:
//! bcrypt credentials, JWT sessions carrying a role snapshot, and role-gated
//! axum routes.

pub mod app;
pub mod core;
