//! In-memory stores for tests and local development.

use super::{RevocationStore, UserStore};
use crate::errors::AuthError;
use crate::models::{NewOrganizationWithAdmin, Organization, Role, User, UserStatus};
use async_trait::async_trait;
use chrono::Utc;
use common::types::{OrgId, SessionId, UserId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

#[derive(Default)]
struct UserTables {
    organizations: HashMap<OrgId, Organization>,
    users: HashMap<UserId, User>,
}

/// `UserStore` backed by two maps behind one lock.
#[derive(Default)]
pub struct InMemoryUserStore {
    tables: RwLock<UserTables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's status.
    pub async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.status = status;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Add a user to an existing organization.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.user_id, user);
    }

    /// Remove a user.
    pub async fn remove_user(&self, user_id: UserId) -> bool {
        self.tables.write().await.users.remove(&user_id).is_some()
    }

    pub async fn organization_count(&self) -> usize {
        self.tables.read().await.organizations.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_organization_with_admin(
        &self,
        new: NewOrganizationWithAdmin,
    ) -> Result<(Organization, User), AuthError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == new.email) {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }
        if tables.organizations.values().any(|o| o.slug == new.slug) {
            return Err(AuthError::Conflict(
                "Organization already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let org_id = OrgId::new();
        let user_id = UserId::new();

        let organization = Organization {
            org_id,
            name: new.organization_name,
            slug: new.slug,
            created_by: Some(user_id),
            created_at: now,
            updated_at: now,
        };

        let user = User {
            user_id,
            org_id,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            avatar_url: None,
            role: Role::Admin,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        tables.organizations.insert(org_id, organization.clone());
        tables.users.insert(user_id, user.clone());

        Ok((organization, user))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_organization_by_id(
        &self,
        org_id: OrgId,
    ) -> Result<Option<Organization>, AuthError> {
        Ok(self.tables.read().await.organizations.get(&org_id).cloned())
    }

    async fn record_login(&self, user_id: UserId) -> Result<(), AuthError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            let now = Utc::now();
            user.last_login_at = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// `RevocationStore` backed by a map of session id to expiry instant.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<SessionId, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, session_id: SessionId, ttl: Duration) -> Result<bool, AuthError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(expires_at) = entries.get(&session_id) {
            if *expires_at > now {
                return Ok(false);
            }
        }

        entries.insert(session_id, now + ttl);
        Ok(true)
    }

    async fn is_revoked(&self, session_id: SessionId) -> Result<bool, AuthError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .get(&session_id)
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
