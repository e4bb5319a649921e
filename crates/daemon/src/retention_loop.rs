// crates/daemon/src/retention_loop.rs
use std::sync::Arc;
use std::time::Duration;

use hookline_core::Config;
use hookline_db::queries::{edits, sessions};
use hookline_db::Database;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline::now_ts;

const WARMUP: Duration = Duration::from_secs(30);
const SECS_PER_DAY: i64 = 86_400;

/// Periodically deletes old edits, caps per-session row counts, and
/// triggers size-guarded aggressive cleanup plus optional VACUUM. Does not
/// run at all when `cleanup_interval_hours` is zero or negative. An initial
/// tick runs after a short warm-up delay so startup is not delayed by it.
pub async fn run(db: Arc<Database>, config: Arc<Config>, shutdown: CancellationToken) {
    if config.retention.cleanup_interval_hours <= 0 {
        info!("retention loop disabled (cleanup_interval_hours <= 0)");
        return;
    }

    tokio::select! {
        _ = tokio::time::sleep(WARMUP) => {}
        _ = shutdown.cancelled() => return,
    }

    let mut interval = tokio::time::interval(Duration::from_secs(
        config.retention.cleanup_interval_hours as u64 * 3600,
    ));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = tick(&db, &config).await {
                    warn!(error = %err, "retention tick failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("retention loop shutting down");
                return;
            }
        }
    }
}

async fn tick(db: &Database, config: &Config) -> Result<(), hookline_db::DbError> {
    let now = now_ts();

    if config.retention.retention_days > 0 {
        let cutoff = now - config.retention.retention_days * SECS_PER_DAY;
        let deleted = edits::delete_edits_before(db, cutoff).await?;
        info!(deleted, cutoff, "retention: deleted expired edits");
    }

    if config.retention.max_edits_per_session > 0 {
        let session_ids = sessions::all_session_ids(db).await?;
        let mut capped = 0u64;
        for session_id in session_ids {
            capped += edits::cap_session_edits(
                db,
                session_id,
                config.retention.max_edits_per_session,
            )
            .await?;
        }
        if capped > 0 {
            info!(capped, "retention: capped per-session edit counts");
        }
    }

    if config.retention.max_db_size_mb > 0 {
        let size = db.size_bytes().await?;
        let threshold = config.retention.max_db_size_mb * 1024 * 1024;
        if size > threshold {
            warn!(size, threshold, "retention: size threshold exceeded, running aggressive cleanup");
            let cutoff = now - 2 * config.retention.retention_days * SECS_PER_DAY;
            let deleted = edits::delete_edits_before(db, cutoff).await?;
            info!(deleted, "retention: aggressive cleanup deleted edits");
            db.vacuum().await?;
        }
    }

    if config.retention.auto_vacuum {
        db.vacuum().await?;
    }

    Ok(())
}
