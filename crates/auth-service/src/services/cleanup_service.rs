//! Periodic purge of expired revocation entries.
//!
//! The task exits when its cancellation token fires.

use crate::errors::AuthError;
use crate::observability::metrics::record_revocations_purged;
use crate::repositories::RevocationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Purge once, recording how many entries were removed.
pub async fn run_once(revocations: &dyn RevocationStore) -> Result<u64, AuthError> {
    let purged = revocations.purge_expired().await?;
    record_revocations_purged(purged);
    if purged > 0 {
        info!(
            target: "auth.cleanup",
            purged_count = purged,
            "Purged expired revocation entries"
        );
    }
    Ok(purged)
}

/// Purge every `interval` until `cancel_token` is cancelled.
pub async fn start_revocation_cleanup(
    revocations: Arc<dyn RevocationStore>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        target: "auth.cleanup",
        interval_secs = interval.as_secs(),
        "Revocation cleanup task started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_once(revocations.as_ref()).await {
                    error!(
                        target: "auth.cleanup",
                        error = %e,
                        "Failed to purge expired revocation entries"
                    );
                }
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "auth.cleanup",
                    "Revocation cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
