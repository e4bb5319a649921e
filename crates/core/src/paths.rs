// crates/core/src/paths.rs
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Derives the per-workspace event bus socket path for `cwd`, so a UI
/// process and a hook started in the same tree reach the same socket
/// without out-of-band coordination.
///
/// The path is `<runtime_dir>/hookline-ws-<hash>.sock`, where `<hash>` is a
/// truncated hex digest of the resolved absolute cwd plus the effective uid.
pub fn workspace_bus_socket(runtime_dir: &Path, cwd: &Path, uid: u32) -> PathBuf {
    let absolute = std::fs::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(absolute.as_os_str().as_encoded_bytes());
    hasher.update(b":");
    hasher.update(uid.to_le_bytes());
    let digest = hasher.finalize();
    let hex = hex_prefix(&digest, 16);
    runtime_dir.join(format!("hookline-ws-{hex}.sock"))
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut out = String::with_capacity(chars);
    for byte in bytes {
        if out.len() >= chars {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(chars);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_cwd_and_uid_produce_the_same_socket_path() {
        let runtime_dir = std::env::temp_dir();
        let a = workspace_bus_socket(&runtime_dir, Path::new("."), 1000);
        let b = workspace_bus_socket(&runtime_dir, Path::new("."), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn different_uid_produces_a_different_socket_path() {
        let runtime_dir = std::env::temp_dir();
        let a = workspace_bus_socket(&runtime_dir, Path::new("."), 1000);
        let b = workspace_bus_socket(&runtime_dir, Path::new("."), 1001);
        assert_ne!(a, b);
    }
}
