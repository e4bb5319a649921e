// crates/daemon/src/backup_loop.rs
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use hookline_core::Config;
use hookline_db::queries::{edits, prompts, sessions};
use hookline_db::Database;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const WARMUP: Duration = Duration::from_secs(60);
const EXPORT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportEnvelope {
    version: u32,
    timestamp: String,
    format: &'static str,
    sessions: Vec<hookline_types::Session>,
    edits: Vec<hookline_types::Edit>,
    prompts: Vec<hookline_types::Prompt>,
}

/// Periodically snapshots the store (or exports it as JSON), compresses the
/// result, and prunes files in the backup directory older than
/// `backup.retention_days`. Disabled unless `backup.enabled`.
pub async fn run(db: Arc<Database>, config: Arc<Config>, shutdown: CancellationToken) {
    if !config.backup.enabled {
        info!("backup loop disabled");
        return;
    }

    tokio::select! {
        _ = tokio::time::sleep(WARMUP) => {}
        _ = shutdown.cancelled() => return,
    }

    let interval_secs = (config.backup.interval_hours.max(1) as u64) * 3600;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = tick(&db, &config).await {
                    warn!(error = %err, "backup tick failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("backup loop shutting down");
                return;
            }
        }
    }
}

async fn tick(db: &Database, config: &Config) -> anyhow::Result<()> {
    let backup_dir = config.backup_dir();
    std::fs::create_dir_all(&backup_dir)?;

    match config.backup.format.as_str() {
        "sqlite" => backup_sqlite(db, &backup_dir).await?,
        "export" => backup_export(db, &backup_dir).await?,
        other => warn!(format = other, "unknown backup format, skipping"),
    }

    prune_old_backups(&backup_dir, config.backup.retention_days)?;
    Ok(())
}

async fn backup_sqlite(db: &Database, backup_dir: &Path) -> anyhow::Result<()> {
    let stamp = timestamp();
    let plain = backup_dir.join(format!("hookline-{stamp}.db"));
    std::fs::copy(db.path(), &plain)?;

    let compressed = backup_dir.join(format!("hookline-{stamp}.db.gz"));
    gzip_file(&plain, &compressed)?;
    std::fs::remove_file(&plain)?;

    info!(path = %compressed.display(), "sqlite backup written");
    Ok(())
}

async fn backup_export(db: &Database, backup_dir: &Path) -> anyhow::Result<()> {
    let session_rows = sessions::sessions(db, i64::MAX).await?;
    let edit_rows = edits::recent_edits(db, i64::MAX).await?;
    let prompt_rows = prompts::prompts(db, "", i64::MAX).await?;

    let envelope = ExportEnvelope {
        version: EXPORT_FORMAT_VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        format: "export",
        sessions: session_rows.into_iter().map(Into::into).collect(),
        edits: edit_rows.into_iter().map(|row| row.into_wire(None)).collect(),
        prompts: prompt_rows.into_iter().map(Into::into).collect(),
    };

    let stamp = timestamp();
    let path = backup_dir.join(format!("hookline-{stamp}.json.gz"));
    let json = serde_json::to_vec(&envelope)?;

    let file = std::fs::File::create(&path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&json)?;
    encoder.finish()?;

    info!(path = %path.display(), "export backup written");
    Ok(())
}

fn gzip_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut input = std::fs::File::open(src)?;
    let output = std::fs::File::create(dst)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

fn prune_old_backups(backup_dir: &Path, retention_days: i64) -> std::io::Result<()> {
    if retention_days <= 0 {
        return Ok(());
    }
    let cutoff = std::time::SystemTime::now()
        .checked_sub(Duration::from_secs(retention_days as u64 * 86_400));
    let Some(cutoff) = cutoff else { return Ok(()) };

    for entry in std::fs::read_dir(backup_dir)?.flatten() {
        let path = entry.path();
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff {
                    if let Err(err) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %err, "failed to prune old backup");
                    }
                }
            }
        }
    }
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string()
}
