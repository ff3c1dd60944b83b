//!
//! # Expiry Sweep
//!
//! Periodic background task moving overdue open proposals to `expired`.
//! The UPDATE only touches rows still in `open`, so sweeping proposals that
//! already reached a terminal state is a no-op by construction.

use sqlx::PgPool;
use std::time::Duration;

/// Expires every open proposal whose deadline has passed.
/// Returns the number of proposals transitioned.
pub async fn expire_due(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE swap_proposals SET status = 'expired', updated_at = now()
         WHERE status = 'open' AND expired_at <= now()",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Runs the sweep forever at the configured interval. Intended to be spawned
/// next to the HTTP server; sweep failures are logged and retried on the
/// next tick.
pub async fn run(pool: PgPool, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        match expire_due(&pool).await {
            Ok(0) => {}
            Ok(n) => log::info!("expired {} overdue proposal(s)", n),
            Err(e) => log::warn!("expiry sweep failed: {}", e),
        }
    }
}
