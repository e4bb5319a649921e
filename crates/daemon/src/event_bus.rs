// crates/daemon/src/event_bus.rs
use std::path::{Path, PathBuf};

use hookline_core::paths;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::debug;

/// Best-effort fan-out of per-workspace events to a listening UI process.
/// The UI owns the listening side of the socket; the daemon is only ever a
/// client here. If no listener is present, the connection attempt fails and
/// is silently dropped — producers cannot and need not distinguish "no UI
/// attached" from any other delivery failure.
#[derive(Clone)]
pub struct EventBus {
    runtime_dir: PathBuf,
}

impl EventBus {
    pub fn new(runtime_dir: PathBuf) -> Self {
        Self { runtime_dir }
    }

    pub async fn notify(&self, workspace_path: &str, payload: &[u8]) {
        let socket_path = self.socket_path_for(workspace_path);
        match UnixStream::connect(&socket_path).await {
            Ok(mut stream) => {
                if let Err(err) = stream.write_all(payload).await {
                    debug!(error = %err, path = %socket_path.display(), "event bus write failed");
                }
            }
            Err(err) => {
                debug!(error = %err, path = %socket_path.display(), "no event bus listener, dropping notification");
            }
        }
    }

    fn socket_path_for(&self, workspace_path: &str) -> PathBuf {
        let uid = effective_uid();
        paths::workspace_bus_socket(&self.runtime_dir, Path::new(workspace_path), uid)
    }
}

fn effective_uid() -> u32 {
    // SAFETY: geteuid takes no arguments and cannot fail.
    unsafe { libc::geteuid() }
}
