//! Core domain: authentication, persistence, configuration and user administration

pub mod auth;
pub mod config;
pub mod db;
pub mod users;
