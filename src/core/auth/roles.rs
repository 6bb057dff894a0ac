//! Role vocabulary
//!
//! The set of roles is fixed. Role names travel as strings (in tokens, in the
//! database, in route declarations), so every comparison goes through
//! [`normalize_role_name`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named capability group assigned to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Every role, in the order they are seeded in the `roles` table
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Admin];

    /// Canonical spelling, as stored in `roles.role_name`
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
            Role::Admin => "Admin",
        }
    }

    /// Whether a caller may pick this role for themselves at registration
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::Patient | Role::Doctor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name is not part of the role vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_role_name(s).as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Canonical comparison form of a role name (trimmed, lower-case)
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_lowercase()
}
