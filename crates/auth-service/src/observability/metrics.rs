//! Metrics definitions for the auth service
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `grant_type`: password, refresh_token, registration
//! - `status`: success, error
//! - `outcome`: bounded by code (rotated, replayed, invalid, ...)
//! - `error_category`: see [`super::ErrorCategory`]
//! - `path`: normalized to known routes or `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Fails if bucket configuration is rejected or a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // bcrypt at cost 12 sits around 200ms; coarse buckets only
        .set_buckets_for_metric(
            Matcher::Prefix("auth_bcrypt".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_token_issuance".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.350, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_db_query".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token pair issuance duration and outcome
///
/// Metric: `auth_token_issuance_duration_seconds`, `auth_token_issuance_total`
/// Labels: `grant_type`, `status`
pub fn record_token_issuance(grant_type: &str, status: &str, duration: Duration) {
    histogram!("auth_token_issuance_duration_seconds", "grant_type" => grant_type.to_string(), "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_token_issuance_total", "grant_type" => grant_type.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record token validation result
///
/// Metric: `auth_token_validations_total`
/// Labels: `token_type`, `status`, `error_category`
pub fn record_token_validation(token_type: &str, status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total",
        "token_type" => token_type.to_string(),
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

/// Record the outcome of a refresh attempt
///
/// Metric: `auth_refresh_total`
/// Labels: `outcome` (rotated, replayed, invalid, inactive_user)
pub fn record_refresh_outcome(outcome: &str) {
    counter!("auth_refresh_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a logout
///
/// Metric: `auth_logout_total`
/// Labels: `outcome` (revoked, already_revoked, invalid_token)
pub fn record_logout(outcome: &str) {
    counter!("auth_logout_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record login failure by reason
///
/// Metric: `auth_login_failures_total`
/// Labels: `reason` (bad_credentials, inactive)
pub fn record_login_failure(reason: &str) {
    counter!("auth_login_failures_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Revocation Store Metrics
// ============================================================================

/// Record expired revocation entries removed by the cleanup task
///
/// Metric: `auth_revocations_purged_total`
pub fn record_revocations_purged(count: u64) {
    counter!("auth_revocations_purged_total").increment(count);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `auth_db_query_duration_seconds`, `auth_db_queries_total`
/// Labels: `operation`, `table`, `status`
pub fn record_db_query(operation: &str, table: &str, status: &str, duration: Duration) {
    histogram!("auth_db_query_duration_seconds", "operation" => operation.to_string(), "table" => table.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_db_queries_total", "operation" => operation.to_string(), "table" => table.to_string(), "status" => status.to_string())
        .increment(1);
}

// ============================================================================
// Crypto Metrics
// ============================================================================

/// Record bcrypt operation duration
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `auth_errors_total`
/// Labels: `error_category`, `status_code`
pub fn record_error(error_category: &str, status_code: u16) {
    counter!("auth_errors_total",
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `auth_http_requests_total`, `auth_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("auth_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Map a request path to a bounded label value.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/auth/register" => "/api/v1/auth/register",
        "/api/v1/auth/login" => "/api/v1/auth/login",
        "/api/v1/auth/refresh" => "/api/v1/auth/refresh",
        "/api/v1/auth/logout" => "/api/v1/auth/logout",
        "/api/v1/auth/me" => "/api/v1/auth/me",
        "/api/v1/auth/organization" => "/api/v1/auth/organization",
        _ => "/other",
    }
}
