// crates/daemon/src/main.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use hookline_core::Config;
use hookline_daemon::activity::ActivityTracker;
use hookline_daemon::backup_loop;
use hookline_daemon::event_bus::EventBus;
use hookline_daemon::ingest::IngestServer;
use hookline_daemon::pipeline::Pipeline;
use hookline_daemon::query::{Dispatcher, QueryServer};
use hookline_daemon::retention_loop;
use hookline_db::Database;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SHUTDOWN_BARRIER: Duration = Duration::from_secs(10);

/// Local daemon that ingests AI-coding-assistant hook events and serves
/// structured queries over a pair of Unix-domain sockets.
#[derive(Parser)]
#[command(name = "hooklined", version)]
struct Cli {
    /// Path to the config file, overriding the default
    /// `~/.config/hookline/config.toml` location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also log to stderr in addition to the daemon log file; full CLI UX
    /// (backgrounding, pidfiles) is out of scope, this only affects logging.
    #[arg(long)]
    foreground: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("hooklined: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(Config::load_from(cli.config)?);

    let _log_guard = setup_logging(&config, cli.foreground)?;
    info!("starting hookline daemon");

    let db = Arc::new(Database::new(&config.db_path()).await?);
    let activity = ActivityTracker::new();
    let event_bus = EventBus::new(std::env::temp_dir());
    let pipeline = Pipeline::new(db.clone(), config.clone(), activity.clone(), event_bus);
    let start_time = Instant::now();
    let dispatcher = Dispatcher::new(db.clone(), config.clone(), activity.clone(), start_time);

    let max_event_bytes = config.hooks.max_event_bytes;
    let ingest_server = IngestServer::bind(&config.sockets.ingest_path, max_event_bytes)?;
    let query_server = QueryServer::bind(&config.sockets.query_path, max_event_bytes)?;

    let shutdown = CancellationToken::new();
    let stop_notify = Arc::new(Notify::new());

    let mut tasks = JoinSet::new();
    tasks.spawn(ingest_server.run(pipeline, shutdown.clone(), stop_notify.clone()));
    tasks.spawn(query_server.run(dispatcher, shutdown.clone()));
    tasks.spawn(retention_loop::run(db.clone(), config.clone(), shutdown.clone()));
    tasks.spawn(backup_loop::run(db.clone(), config.clone(), shutdown.clone()));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        ingest = %config.sockets.ingest_path.display(),
        query = %config.sockets.query_path.display(),
        "daemon ready"
    );

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = stop_notify.notified() => info!("stop requested, shutting down"),
    }

    shutdown.cancel();

    if tokio::time::timeout(SHUTDOWN_BARRIER, async {
        while tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        error!("shutdown barrier timed out after {:?}, proceeding anyway", SHUTDOWN_BARRIER);
    }

    let _ = std::fs::remove_file(&config.sockets.ingest_path);
    let _ = std::fs::remove_file(&config.sockets.query_path);

    info!("daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &Config,
    foreground: bool,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = config
        .logging
        .file
        .as_ref()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| config.directory.data_dir.join("logs"));
    std::fs::create_dir_all(&log_dir)?;

    let file_name = config
        .logging
        .file
        .as_ref()
        .and_then(|p| p.file_name().map(|n| n.to_owned()))
        .unwrap_or_else(|| "hookline.log".into());

    let file_appender = tracing_appender::rolling::daily(&log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let stderr_layer = foreground.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(stderr_layer)
        .init();

    Ok(guard)
}
