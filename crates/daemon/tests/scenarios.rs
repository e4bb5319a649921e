// crates/daemon/tests/scenarios.rs
//
// Drives real Unix-domain-socket servers end to end: a producer connection
// writes raw JSON records to the ingest endpoint, a consumer connection
// writes a single request to the query endpoint and reads back one
// response. No mocking of the socket layer.

use std::sync::Arc;
use std::time::Duration;

use hookline_core::Config;
use hookline_daemon::activity::ActivityTracker;
use hookline_daemon::event_bus::EventBus;
use hookline_daemon::ingest::IngestServer;
use hookline_daemon::pipeline::Pipeline;
use hookline_daemon::query::{Dispatcher, QueryServer};
use hookline_db::Database;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

struct Harness {
    db: Arc<Database>,
    ingest_path: std::path::PathBuf,
    query_path: std::path::PathBuf,
    shutdown: CancellationToken,
    stop: Arc<Notify>,
    _dir: tempfile::TempDir,
}

async fn spawn_harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(Database::new(&dir.path().join("hookline.db")).await.expect("open db"));

    let mut config = Config::default();
    config.sockets.ingest_path = dir.path().join("ingest.sock");
    config.sockets.query_path = dir.path().join("query.sock");
    let config = Arc::new(config);

    let activity = ActivityTracker::new();
    let event_bus = EventBus::new(dir.path().to_path_buf());
    let pipeline = Pipeline::new(db.clone(), config.clone(), activity.clone(), event_bus);
    let dispatcher = Dispatcher::new(db.clone(), config.clone(), activity.clone(), std::time::Instant::now());

    let max_event_bytes = config.hooks.max_event_bytes;
    let ingest_server = IngestServer::bind(&config.sockets.ingest_path, max_event_bytes).expect("bind ingest");
    let query_server = QueryServer::bind(&config.sockets.query_path, max_event_bytes).expect("bind query");

    let shutdown = CancellationToken::new();
    let stop = Arc::new(Notify::new());

    tokio::spawn(ingest_server.run(pipeline, shutdown.clone(), stop.clone()));
    tokio::spawn(query_server.run(dispatcher, shutdown.clone()));

    // give both accept loops a moment to be listening.
    tokio::time::sleep(Duration::from_millis(20)).await;

    Harness {
        db,
        ingest_path: config.sockets.ingest_path.clone(),
        query_path: config.sockets.query_path.clone(),
        shutdown,
        stop,
        _dir: dir,
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn send_records(path: &std::path::Path, records: &[Value]) -> Vec<Value> {
    let mut stream = UnixStream::connect(path).await.expect("connect ingest");
    let mut acks = Vec::new();
    for record in records {
        let bytes = serde_json::to_vec(record).unwrap();
        stream.write_all(&bytes).await.unwrap();

        let mut buf = vec![0u8; 64 * 1024];
        let n = stream.read(&mut buf).await.unwrap();
        acks.push(serde_json::from_slice(&buf[..n]).unwrap());
    }
    acks
}

async fn send_query(path: &std::path::Path, request: Value) -> Value {
    let mut stream = UnixStream::connect(path).await.expect("connect query");
    let bytes = serde_json::to_vec(&request).unwrap();
    stream.write_all(&bytes).await.unwrap();
    stream.shutdown().await.unwrap_or(());

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    serde_json::from_slice(&buf).unwrap()
}

/// S1: an edit event, once acknowledged, is immediately visible to a
/// workspace query on the query endpoint.
#[tokio::test]
async fn s1_edit_is_visible_to_workspace_query_after_ack() {
    let h = spawn_harness().await;

    let acks = send_records(
        &h.ingest_path,
        &[json!({
            "type": "edit",
            "workspace": "/repo/a",
            "workspace_name": "a",
            "branch": "main",
            "tool_name": "edit_file",
            "file_path": "src/lib.rs",
            "old_string": "foo",
            "new_string": "bar",
            "line_num": 10,
            "line_count": 1,
        })],
    )
    .await;
    assert_eq!(acks[0]["status"], "ok");

    let response = send_query(
        &h.query_path,
        json!({"type": "workspace", "workspace_path": "/repo/a"}),
    )
    .await;
    assert_eq!(response["type"], "workspace");
    assert_eq!(response["edits"].as_array().unwrap().len(), 1);
    assert_eq!(response["edits"][0]["file_path"], "src/lib.rs");
}

/// S2: events for an ignored workspace are acknowledged as success but
/// never persisted or surfaced to any query.
#[tokio::test]
async fn s2_ignored_workspace_events_ack_but_do_not_persist() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(&dir.path().join("hookline.db")).await.unwrap());

    let mut config = Config::default();
    config.sockets.ingest_path = dir.path().join("ingest.sock");
    config.sockets.query_path = dir.path().join("query.sock");
    config.workspaces.ignored = vec!["/repo/ignored".to_string()];
    let config = Arc::new(config);

    let activity = ActivityTracker::new();
    let event_bus = EventBus::new(dir.path().to_path_buf());
    let pipeline = Pipeline::new(db.clone(), config.clone(), activity.clone(), event_bus);
    let dispatcher = Dispatcher::new(db.clone(), config.clone(), activity.clone(), std::time::Instant::now());

    let max_event_bytes = config.hooks.max_event_bytes;
    let ingest_server = IngestServer::bind(&config.sockets.ingest_path, max_event_bytes).unwrap();
    let query_server = QueryServer::bind(&config.sockets.query_path, max_event_bytes).unwrap();
    let shutdown = CancellationToken::new();
    let stop = Arc::new(Notify::new());
    tokio::spawn(ingest_server.run(pipeline, shutdown.clone(), stop.clone()));
    tokio::spawn(query_server.run(dispatcher, shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let acks = send_records(
        &config.sockets.ingest_path,
        &[json!({
            "type": "edit",
            "workspace": "/repo/ignored",
            "file_path": "x.rs",
        })],
    )
    .await;
    assert_eq!(acks[0]["status"], "ok");

    let response = send_query(
        &config.sockets.query_path,
        json!({"type": "workspace", "workspace_path": "/repo/ignored"}),
    )
    .await;
    assert!(response["edits"].as_array().unwrap().is_empty());

    shutdown.cancel();
}

/// S3: a prompt event, captured and re-sent with the same name and
/// session, increments version rather than duplicating the row.
#[tokio::test]
async fn s3_repeated_prompt_name_increments_version_not_row_count() {
    let h = spawn_harness().await;

    let record = json!({
        "type": "prompt",
        "workspace": "/repo/b",
        "workspace_name": "b",
        "branch": "main",
        "prompt_name": "review-checklist",
        "prompt_description": "pre-merge checklist",
        "new_string": "check tests, check docs",
        "prompt_tags": ["review"],
    });
    send_records(&h.ingest_path, &[record.clone(), record]).await;

    let response = send_query(&h.query_path, json!({"type": "prompts", "name": "review"})).await;
    let prompts = response["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["version"], 2);
}

/// S4: a malformed record is rejected with an error ack but does not
/// close the connection or break subsequent records.
#[tokio::test]
async fn s4_malformed_record_is_rejected_without_closing_connection() {
    let h = spawn_harness().await;

    let mut stream = UnixStream::connect(&h.ingest_path).await.unwrap();
    stream.write_all(br#"{"not_a_type_field": true}"#).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.unwrap();
    let first: Value = serde_json::from_slice(&buf[..n]).unwrap();
    assert!(first.get("error").is_some());

    stream
        .write_all(
            serde_json::to_vec(&json!({
                "type": "edit",
                "workspace": "/repo/c",
                "file_path": "y.rs",
            }))
            .unwrap()
            .as_slice(),
        )
        .await
        .unwrap();
    let n = stream.read(&mut buf).await.unwrap();
    let second: Value = serde_json::from_slice(&buf[..n]).unwrap();
    assert_eq!(second["status"], "ok");
}

/// S5: the status query reports in-memory activity for a workspace that
/// has received events during this process's lifetime.
#[tokio::test]
async fn s5_status_query_reports_workspace_activity() {
    let h = spawn_harness().await;

    send_records(
        &h.ingest_path,
        &[json!({
            "type": "edit",
            "workspace": "/repo/d",
            "workspace_name": "d",
            "branch": "main",
            "file_path": "z.rs",
        })],
    )
    .await;

    let response = send_query(
        &h.query_path,
        json!({"type": "status", "workspace_path": "/repo/d"}),
    )
    .await;
    let status = &response["status"];
    assert_eq!(status["running"], true);
    let active = &status["active_workspace"];
    assert_eq!(active["edit_count"], 1);
}

/// S6: an explicit shutdown control record over the ingest endpoint
/// triggers the stop signal without requiring a signal to the process.
#[tokio::test]
async fn s6_shutdown_control_record_triggers_stop_signal() {
    let h = spawn_harness().await;

    let acks = send_records(&h.ingest_path, &[json!({"type": "shutdown"})]).await;
    assert_eq!(acks[0]["status"], "ok");

    tokio::time::timeout(Duration::from_secs(1), h.stop.notified())
        .await
        .expect("stop signal fired");
}

/// The per-(workspace,branch) session is reused across repeated edits
/// rather than growing without bound.
#[tokio::test]
async fn repeated_edits_in_same_workspace_share_one_session() {
    let h = spawn_harness().await;

    send_records(
        &h.ingest_path,
        &[
            json!({"type": "edit", "workspace": "/repo/e", "branch": "main", "file_path": "a.rs"}),
            json!({"type": "edit", "workspace": "/repo/e", "branch": "main", "file_path": "b.rs"}),
        ],
    )
    .await;

    let response = send_query(&h.query_path, json!({"type": "sessions"})).await;
    let sessions = response["sessions"].as_array().unwrap();
    let matching: Vec<_> = sessions
        .iter()
        .filter(|s| s["workspace_path"] == "/repo/e")
        .collect();
    assert_eq!(matching.len(), 1);

    // sanity: the database actually recorded two edits against that session.
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM edits")
        .fetch_one(h.db.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 2);
}

/// S4: when a request omits `limit`, the configured default is applied
/// even though more rows exist.
#[tokio::test]
async fn s4_recent_query_without_limit_uses_configured_default() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(&dir.path().join("hookline.db")).await.unwrap());

    let mut config = Config::default();
    config.sockets.ingest_path = dir.path().join("ingest.sock");
    config.sockets.query_path = dir.path().join("query.sock");
    config.query.default_limit = 10;
    let config = Arc::new(config);

    let activity = ActivityTracker::new();
    let event_bus = EventBus::new(dir.path().to_path_buf());
    let pipeline = Pipeline::new(db.clone(), config.clone(), activity.clone(), event_bus);
    let dispatcher = Dispatcher::new(db.clone(), config.clone(), activity.clone(), std::time::Instant::now());

    let max_event_bytes = config.hooks.max_event_bytes;
    let ingest_server = IngestServer::bind(&config.sockets.ingest_path, max_event_bytes).unwrap();
    let query_server = QueryServer::bind(&config.sockets.query_path, max_event_bytes).unwrap();
    let shutdown = CancellationToken::new();
    let stop = Arc::new(Notify::new());
    tokio::spawn(ingest_server.run(pipeline, shutdown.clone(), stop.clone()));
    tokio::spawn(query_server.run(dispatcher, shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let records: Vec<Value> = (0..20)
        .map(|i| {
            json!({
                "type": "edit",
                "workspace": "/repo/g",
                "file_path": format!("file-{i}.rs"),
            })
        })
        .collect();
    send_records(&config.sockets.ingest_path, &records).await;

    let response = send_query(&config.sockets.query_path, json!({"type": "recent"})).await;
    assert_eq!(response["edits"].as_array().unwrap().len(), 10);

    shutdown.cancel();
}

/// A file query decompresses and base64-re-encodes the stored snapshot,
/// while a workspace/recent query never surfaces it.
#[tokio::test]
async fn file_query_surfaces_snapshot_other_queries_do_not() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let h = spawn_harness().await;
    let content = BASE64.encode(b"fn main() {}\n");

    send_records(
        &h.ingest_path,
        &[json!({
            "type": "edit",
            "workspace": "/repo/f",
            "file_path": "src/main.rs",
            "file_content_b64": content,
        })],
    )
    .await;

    let file_response = send_query(
        &h.query_path,
        json!({"type": "file", "file_path": "src/main.rs"}),
    )
    .await;
    assert!(file_response["edits"][0]["file_content_b64"].is_string());

    let workspace_response = send_query(
        &h.query_path,
        json!({"type": "workspace", "workspace_path": "/repo/f"}),
    )
    .await;
    assert!(workspace_response["edits"][0].get("file_content_b64").is_none());
}
