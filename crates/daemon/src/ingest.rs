// crates/daemon/src/ingest.rs
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use hookline_types::IncomingEvent;

use crate::codec::JsonRecordCodec;
use crate::pipeline::Pipeline;

/// Record type recognized on the ingest endpoint as a control signal rather
/// than an event to persist: `{"type":"shutdown"}` requests a clean daemon
/// stop, an alternative to the producer connecting and then closing.
const SHUTDOWN_RECORD_TYPE: &str = "shutdown";

/// Accepts producer connections on the ingest endpoint. Each connection is
/// handled by an independent task that decodes a stream of event records
/// and writes a single-line JSON ack after each one; the server itself does
/// not queue, so slow pipeline work only blocks further decodes on that one
/// connection.
pub struct IngestServer {
    listener: UnixListener,
    max_record_bytes: usize,
}

impl IngestServer {
    /// Removes any stale endpoint file before binding, matching the
    /// producer contract that a crashed daemon's leftover socket file must
    /// not block the next startup.
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

    pub async fn run(self, pipeline: Pipeline, shutdown: CancellationToken, stop: Arc<Notify>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let pipeline = pipeline.clone();
                            let stop = stop.clone();
                            let max_record_bytes = self.max_record_bytes;
                            tokio::spawn(async move {
                                if let Err(err) =
                                    handle_connection(stream, pipeline, stop, max_record_bytes).await
                                {
                                    debug!(error = %err, "ingest connection ended");
                                }
                            });
                        }
                        Err(err) => error!(error = %err, "ingest accept error"),
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("ingest server shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    pipeline: Pipeline,
    stop: Arc<Notify>,
    max_record_bytes: usize,
) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, JsonRecordCodec::with_max_record_bytes(max_record_bytes));

    while let Some(decoded) = framed.next().await {
        let value = match decoded {
            Ok(value) => value,
            Err(err) => return Err(err),
        };

        if value.get("type").and_then(Value::as_str) == Some(SHUTDOWN_RECORD_TYPE) {
            stop.notify_one();
            write_record(&mut framed, &serde_json::json!({"status": "ok"})).await?;
            continue;
        }

        let ack = match serde_json::from_value::<IncomingEvent>(value) {
            Ok(event) => match pipeline.process(event).await {
                Ok(()) => serde_json::json!({"status": "ok"}),
                Err(err) if err.is_peer_facing() => {
                    warn!(error = %err, "event rejected");
                    serde_json::json!({"error": err.to_string()})
                }
                Err(err) => {
                    error!(error = %err, "event processing failed on a non-peer-facing error");
                    serde_json::json!({"error": "internal error"})
                }
            },
            Err(err) => serde_json::json!({"error": format!("malformed event: {err}")}),
        };

        write_record(&mut framed, &ack).await?;
    }
    Ok(())
}

async fn write_record(
    framed: &mut Framed<UnixStream, JsonRecordCodec>,
    value: &Value,
) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    let bytes = serde_json::to_vec(value)?;
    framed.get_mut().write_all(&bytes).await
}
