//! In-process user repository
//!
//! Same contract as the PostgreSQL repository, held in memory behind a single
//! lock so the uniqueness checks and the insert happen atomically. Used when no
//! `DATABASE_URL` is configured in development, and by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use crate::core::auth::roles::Role;
use crate::core::db::models::{NewAccount, RoleRecord, User, UserChanges, UserDetails};
use crate::core::db::store::{CredentialStore, StoreError};

#[derive(Debug)]
struct MemoryState {
    next_user_id: i64,
    users: BTreeMap<i64, User>,
    details: BTreeMap<i64, UserDetails>,
    roles: Vec<RoleRecord>,
    user_roles: BTreeMap<i64, BTreeSet<i32>>,
}

impl MemoryState {
    fn role_record(&self, role: Role) -> Result<&RoleRecord, StoreError> {
        self.roles
            .iter()
            .find(|r| r.role_name.eq_ignore_ascii_case(role.as_str()))
            .ok_or_else(|| StoreError::RoleNotFound(role.to_string()))
    }
}

/// In-memory user repository
#[derive(Debug)]
pub struct MemoryUserRepository {
    state: RwLock<MemoryState>,
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserRepository {
    /// Empty repository seeded with the full role vocabulary
    pub fn new() -> Self {
        Self::with_roles(&Role::ALL)
    }

    /// Empty repository whose role table holds only `roles`
    pub fn with_roles(roles: &[Role]) -> Self {
        let roles = roles
            .iter()
            .zip(1..)
            .map(|(role, role_id)| RoleRecord {
                role_id,
                role_name: role.as_str().to_string(),
            })
            .collect();

        Self {
            state: RwLock::new(MemoryState {
                next_user_id: 1,
                users: BTreeMap::new(),
                details: BTreeMap::new(),
                roles,
                user_roles: BTreeMap::new(),
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryUserRepository {
    async fn find_by_dni_or_email(
        &self,
        dni: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.dni == dni || (email.is_some() && u.email.as_deref() == email))
            .cloned())
    }

    async fn find_by_dni(&self, dni: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.dni == dni).cloned())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        let duplicate = state.users.values().any(|u| {
            u.dni == account.dni || (account.email.is_some() && u.email == account.email)
        });
        if duplicate {
            return Err(StoreError::DuplicateAccount);
        }

        let role_id = state.role_record(account.role)?.role_id;

        let user_id = state.next_user_id;
        state.next_user_id += 1;

        let user = User {
            user_id,
            name: account.name,
            dni: account.dni,
            email: account.email,
            password_hash: account.password_hash,
            created_at: Utc::now(),
        };

        state.users.insert(user_id, user.clone());
        state.details.insert(
            user_id,
            UserDetails {
                user_id,
                date_of_birth: account.details.date_of_birth,
                contact_info: account.details.contact_info,
                specialty: account.details.specialty,
                availability: account.details.availability,
            },
        );
        state.user_roles.insert(user_id, BTreeSet::from([role_id]));

        Ok(user)
    }

    async fn details_for_user(&self, user_id: i64) -> Result<Option<UserDetails>, StoreError> {
        let state = self.state.read().await;
        Ok(state.details.get(&user_id).cloned())
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let Some(role_ids) = state.user_roles.get(&user_id) else {
            return Ok(Vec::new());
        };

        Ok(state
            .roles
            .iter()
            .filter(|r| role_ids.contains(&r.role_id))
            .map(|r| r.role_name.clone())
            .collect())
    }

    async fn update_user(&self, user_id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        if let Some(email) = &changes.email {
            let taken = state
                .users
                .values()
                .any(|u| u.user_id != user_id && u.email.as_ref() == Some(email));
            if taken {
                return Err(StoreError::DuplicateAccount);
            }
        }

        let user = state.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = Some(email);
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }

        Ok(user.clone())
    }

    async fn assign_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        let role_id = state.role_record(role)?.role_id;
        state.user_roles.entry(user_id).or_default().insert(role_id);

        Ok(())
    }

    async fn revoke_role(&self, user_id: i64, role_id: i32) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        let held = state.user_roles.entry(user_id).or_default();
        if !held.contains(&role_id) {
            return Err(StoreError::RoleNotAssigned { user_id, role_id });
        }
        if held.len() == 1 {
            return Err(StoreError::LastRole(user_id));
        }

        held.remove(&role_id);
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.roles.clone())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(state
            .users
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        let existed = state.users.remove(&user_id).is_some();
        state.details.remove(&user_id);
        state.user_roles.remove(&user_id);

        Ok(existed)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
