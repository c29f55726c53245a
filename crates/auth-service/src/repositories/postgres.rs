//! Postgres-backed `UserStore`.

use super::UserStore;
use crate::errors::AuthError;
use crate::models::{NewOrganizationWithAdmin, Organization, Role, User, UserStatus};
use crate::observability::metrics::record_db_query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{OrgId, UserId};
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

const ORGANIZATION_SLUG_CONSTRAINT: &str = "organizations_slug_key";
const USER_EMAIL_CONSTRAINT: &str = "users_email_key";

const USER_COLUMNS: &str = "user_id, org_id, email, password_hash, first_name, last_name, \
     phone, avatar_url, role, status, last_login_at, created_at, updated_at";

const ORGANIZATION_COLUMNS: &str = "org_id, name, slug, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    org_id: Uuid,
    name: String,
    slug: String,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            org_id: OrgId(row.org_id),
            name: row.name,
            slug: row.slug,
            created_by: row.created_by.map(UserId),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    org_id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    avatar_url: Option<String>,
    role: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(AuthError::Database)?;
        let status: UserStatus = row.status.parse().map_err(AuthError::Database)?;

        Ok(Self {
            user_id: UserId(row.user_id),
            org_id: OrgId(row.org_id),
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            avatar_url: row.avatar_url,
            role,
            status,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Translate unique violations on email or slug into `Conflict`.
fn map_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(USER_EMAIL_CONSTRAINT) => {
                    AuthError::Conflict("Email already registered".to_string())
                }
                Some(ORGANIZATION_SLUG_CONSTRAINT) => {
                    AuthError::Conflict("Organization already exists".to_string())
                }
                _ => AuthError::Conflict("Resource already exists".to_string()),
            };
        }
    }
    AuthError::Database(format!("Failed to create organization: {err}"))
}

fn status_label<T>(result: &Result<T, AuthError>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_organization_with_admin(
        &self,
        new: NewOrganizationWithAdmin,
    ) -> Result<(Organization, User), AuthError> {
        let mut tx = self.pool.begin().await?;

        let org_row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "INSERT INTO organizations (name, slug) VALUES ($1, $2) \
             RETURNING {ORGANIZATION_COLUMNS}"
        ))
        .bind(&new.organization_name)
        .bind(&new.slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        let user_row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
             (org_id, email, password_hash, first_name, last_name, phone, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(org_row.org_id)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone)
        .bind(Role::Admin.as_str())
        .bind(UserStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        let org_row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "UPDATE organizations SET created_by = $1, updated_at = NOW() \
             WHERE org_id = $2 RETURNING {ORGANIZATION_COLUMNS}"
        ))
        .bind(user_row.user_id)
        .bind(org_row.org_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((Organization::from(org_row), User::try_from(user_row)?))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_organization_with_admin(
        &self,
        new: NewOrganizationWithAdmin,
    ) -> Result<(Organization, User), AuthError> {
        let start = Instant::now();
        let result = self.insert_organization_with_admin(new).await;
        record_db_query("insert", "organizations", status_label(&result), start.elapsed());
        result
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by email: {e}")))
        .and_then(|row| row.map(User::try_from).transpose());
        record_db_query("select", "users", status_label(&result), start.elapsed());
        result
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by id: {e}")))
        .and_then(|row| row.map(User::try_from).transpose());
        record_db_query("select", "users", status_label(&result), start.elapsed());
        result
    }

    async fn find_organization_by_id(
        &self,
        org_id: OrgId,
    ) -> Result<Option<Organization>, AuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE org_id = $1"
        ))
        .bind(org_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Organization::from))
        .map_err(|e| AuthError::Database(format!("Failed to fetch organization: {e}")));
        record_db_query("select", "organizations", status_label(&result), start.elapsed());
        result
    }

    async fn record_login(&self, user_id: UserId) -> Result<(), AuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| AuthError::Database(format!("Failed to update last login: {e}")));
        record_db_query("update", "users", status_label(&result), start.elapsed());
        result
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
