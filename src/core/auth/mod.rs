//! Authentication and authorization
//!
//! - Password hashing (bcrypt)
//! - Session tokens (HS256 JWT carrying a role snapshot)
//! - Session authenticator and role authorizer middleware
//! - Registration, login and profile endpoints

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod service;

pub use api::{ApiError, AuthApiState, auth_api_router};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, SessionToken};
pub use middleware::{AllowedRoles, AuthContext, authenticate, authorize};
pub use password::{HashError, PasswordHasher};
pub use roles::{Role, UnknownRole};
pub use service::{
    AuthError, AuthService, LoginRequest, LoginResponse, RegisterRequest, RegisteredUser,
};
