//! Storage collaborators for the token service.
//!
//! - [`UserStore`]: organizations and users
//! - [`RevocationStore`]: revoked session ids with expiry
//!
//! Each trait has a Postgres implementation and an in-memory one for tests.
//! The revocation store additionally has a Redis implementation.

pub mod memory;
pub mod postgres;
pub mod revocations;

pub use memory::{InMemoryRevocationStore, InMemoryUserStore};
pub use postgres::PgUserStore;
pub use revocations::{PgRevocationStore, RedisRevocationStore};

use crate::errors::AuthError;
use crate::models::{NewOrganizationWithAdmin, Organization, User};
use async_trait::async_trait;
use common::types::{OrgId, SessionId, UserId};
use std::time::Duration;

/// Lookup and creation of organizations and users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an organization and its admin user as one unit.
    ///
    /// Fails with `Conflict` (and creates nothing) if the email or the
    /// organization slug is already taken.
    async fn create_organization_with_admin(
        &self,
        new: NewOrganizationWithAdmin,
    ) -> Result<(Organization, User), AuthError>;

    /// Find a user by normalized (lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError>;

    async fn find_organization_by_id(
        &self,
        org_id: OrgId,
    ) -> Result<Option<Organization>, AuthError>;

    /// Set `last_login_at` to now.
    async fn record_login(&self, user_id: UserId) -> Result<(), AuthError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), AuthError>;
}

/// Set of revoked session ids.
///
/// Entries only need to outlive the refresh token they block, so every
/// insert carries a TTL.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Atomically insert `session_id` if absent.
    ///
    /// Returns `true` for the caller that inserted it and `false` if it was
    /// already revoked. Concurrent callers for one id see exactly one `true`.
    async fn revoke(&self, session_id: SessionId, ttl: Duration) -> Result<bool, AuthError>;

    async fn is_revoked(&self, session_id: SessionId) -> Result<bool, AuthError>;

    /// Remove expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, AuthError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), AuthError>;
}
