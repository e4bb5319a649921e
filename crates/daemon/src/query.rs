// crates/daemon/src/query.rs
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use hookline_core::{compress, Config, Error};
use hookline_db::queries::{edits, prompts, sessions};
use hookline_db::Database;
use hookline_types::{QueryRequest, QueryResponse, StatusPayload};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::activity::ActivityTracker;
use crate::codec::JsonRecordCodec;

#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Database>,
    config: Arc<Config>,
    activity: ActivityTracker,
    start_time: Instant,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, config: Arc<Config>, activity: ActivityTracker, start_time: Instant) -> Self {
        Self { db, config, activity, start_time }
    }

    fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(limit) if limit > 0 => limit.min(self.config.query.max_limit),
            _ => self.config.query.default_limit,
        }
    }

    pub async fn dispatch(&self, request: QueryRequest) -> QueryResponse {
        let result = match request.kind.as_str() {
            "recent" => self.query_recent(&request).await,
            "workspace" => self.query_workspace(&request).await,
            "file" => self.query_file(&request).await,
            "prompts" => self.query_prompts(&request).await,
            "sessions" => self.query_sessions(&request).await,
            "status" => self.query_status(&request).await,
            other => Err(Error::invalid(format!("unknown query type: {other}"))),
        };

        match result {
            Ok(response) => response,
            Err(err) => QueryResponse::error(request.kind.clone(), err.to_string()),
        }
    }

    async fn query_recent(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let limit = self.clamp_limit(request.limit);
        let rows = edits::recent_edits(&self.db, limit).await.map_err(|e| e.classify())?;
        let mut response = QueryResponse::empty("recent");
        response.edits = rows.into_iter().map(|row| row.into_wire(None)).collect();
        Ok(response)
    }

    async fn query_workspace(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let workspace_path = request
            .workspace_path
            .as_deref()
            .ok_or_else(|| Error::invalid("workspace query requires workspace_path"))?;
        let limit = self.clamp_limit(request.limit);
        let rows = edits::edits_by_workspace(&self.db, workspace_path, limit)
            .await
            .map_err(|e| e.classify())?;
        let mut response = QueryResponse::empty("workspace");
        response.edits = rows.into_iter().map(|row| row.into_wire(None)).collect();
        Ok(response)
    }

    async fn query_file(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let file_path = request
            .file_path
            .as_deref()
            .ok_or_else(|| Error::invalid("file query requires file_path"))?;
        let limit = self.clamp_limit(request.limit);
        let rows = edits::edits_by_file(&self.db, file_path, limit)
            .await
            .map_err(|e| e.classify())?;
        let mut response = QueryResponse::empty("file");
        response.edits = rows
            .into_iter()
            .map(|row| {
                let content = row
                    .file_snapshot
                    .as_deref()
                    .filter(|bytes| !bytes.is_empty())
                    .and_then(|bytes| compress::gunzip(bytes).ok())
                    .map(|decompressed| BASE64.encode(decompressed));
                row.into_wire(content)
            })
            .collect();
        Ok(response)
    }

    async fn query_prompts(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let name_pattern = request.name.as_deref().unwrap_or("");
        let limit = self.clamp_limit(request.limit);
        let rows = prompts::prompts(&self.db, name_pattern, limit)
            .await
            .map_err(|e| e.classify())?;
        let mut response = QueryResponse::empty("prompts");
        response.prompts = rows.into_iter().map(Into::into).collect();
        Ok(response)
    }

    async fn query_sessions(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let limit = self.clamp_limit(request.limit);
        let rows = sessions::sessions(&self.db, limit).await.map_err(|e| e.classify())?;
        let mut response = QueryResponse::empty("sessions");
        response.sessions = rows.into_iter().map(Into::into).collect();
        Ok(response)
    }

    async fn query_status(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let workspaces = self.activity.snapshot().await;
        let active_workspace = match &request.workspace_path {
            Some(path) => self.activity.get(path).await,
            None => None,
        };
        let mut response = QueryResponse::empty("status");
        response.status = Some(StatusPayload {
            running: true,
            uptime_ms: self.start_time.elapsed().as_millis() as i64,
            workspaces: workspaces.into_iter().collect(),
            active_workspace,
        });
        Ok(response)
    }
}

/// Accepts consumer connections on the query endpoint. Each connection
/// decodes exactly one request, dispatches it, writes exactly one response,
/// and returns — matching the query endpoint's one-shot contract.
pub struct QueryServer {
    listener: UnixListener,
    max_record_bytes: usize,
}

impl QueryServer {
    pub fn bind(path: &Path, max_record_bytes: usize) -> std::io::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, max_record_bytes })
    }

    pub async fn run(self, dispatcher: Dispatcher, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let dispatcher = dispatcher.clone();
                            let max_record_bytes = self.max_record_bytes;
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, dispatcher, max_record_bytes).await {
                                    debug!(error = %err, "query connection ended");
                                }
                            });
                        }
                        Err(err) => error!(error = %err, "query accept error"),
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("query server shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    dispatcher: Dispatcher,
    max_record_bytes: usize,
) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, JsonRecordCodec::with_max_record_bytes(max_record_bytes));

    let Some(decoded) = framed.next().await else {
        return Ok(());
    };
    let value = decoded?;

    let response = match serde_json::from_value::<QueryRequest>(value) {
        Ok(request) => dispatcher.dispatch(request).await,
        Err(err) => QueryResponse::error("unknown", format!("malformed request: {err}")),
    };

    let bytes = serde_json::to_vec(&response)?;
    framed.get_mut().write_all(&bytes).await
}
