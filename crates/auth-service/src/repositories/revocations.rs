//! Durable `RevocationStore` implementations.
//!
//! Redis keys expire on their own, so `purge_expired` is a no-op there.
//! The Postgres table relies on the cleanup task.

use super::RevocationStore;
use crate::errors::AuthError;
use crate::observability::metrics::record_db_query;
use async_trait::async_trait;
use common::types::SessionId;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{error, instrument};

const REVOKED_KEY_PREFIX: &str = "auth:revoked:";

fn revoked_key(session_id: SessionId) -> String {
    format!("{REVOKED_KEY_PREFIX}{session_id}")
}

/// Redis-backed revocation set using `SET NX EX`.
#[derive(Clone)]
pub struct RedisRevocationStore {
    connection: MultiplexedConnection,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Revocation` if the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self, AuthError> {
        // Do not log redis_url, it may carry credentials
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "auth.revocation", error = %e, "Failed to open Redis client");
            AuthError::Revocation(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "auth.revocation", error = %e, "Failed to connect to Redis");
                AuthError::Revocation(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    #[instrument(skip_all)]
    async fn revoke(&self, session_id: SessionId, ttl: Duration) -> Result<bool, AuthError> {
        let mut conn = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(revoked_key(session_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!(target: "auth.revocation", error = %e, "Failed to revoke session");
                AuthError::Revocation(format!("Failed to revoke session: {e}"))
            })?;

        Ok(reply.is_some())
    }

    #[instrument(skip_all)]
    async fn is_revoked(&self, session_id: SessionId) -> Result<bool, AuthError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(revoked_key(session_id)).await.map_err(|e| {
            error!(target: "auth.revocation", error = %e, "Failed to check revocation");
            AuthError::Revocation(format!("Failed to check revocation: {e}"))
        })?;
        Ok(exists)
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(0)
    }

    async fn ping(&self) -> Result<(), AuthError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Postgres-backed revocation set in the `revoked_sessions` table.
#[derive(Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    #[instrument(skip_all)]
    async fn revoke(&self, session_id: SessionId, ttl: Duration) -> Result<bool, AuthError> {
        let start = Instant::now();
        // An expired row is treated as absent and reclaimed in place.
        let result = sqlx::query(
            r#"
            INSERT INTO revoked_sessions (session_id, expires_at)
            VALUES ($1, NOW() + $2 * INTERVAL '1 second')
            ON CONFLICT (session_id) DO UPDATE
                SET expires_at = EXCLUDED.expires_at, revoked_at = NOW()
                WHERE revoked_sessions.expires_at <= NOW()
            "#,
        )
        .bind(session_id.as_uuid())
        .bind(ttl.as_secs_f64().max(1.0))
        .execute(&self.pool)
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("insert", "revoked_sessions", status, start.elapsed());

        let done = result
            .map_err(|e| AuthError::Revocation(format!("Failed to revoke session: {e}")))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip_all)]
    async fn is_revoked(&self, session_id: SessionId) -> Result<bool, AuthError> {
        let start = Instant::now();
        let result: Result<bool, sqlx::Error> = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM revoked_sessions \
             WHERE session_id = $1 AND expires_at > NOW())",
        )
        .bind(session_id.as_uuid())
        .fetch_one(&self.pool)
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("select", "revoked_sessions", status, start.elapsed());

        result.map_err(|e| AuthError::Revocation(format!("Failed to check revocation: {e}")))
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("delete", "revoked_sessions", status, start.elapsed());

        let done = result
            .map_err(|e| AuthError::Revocation(format!("Failed to purge revocations: {e}")))?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Revocation(format!("Revocation table unreachable: {e}")))?;
        Ok(())
    }
}
