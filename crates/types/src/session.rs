// crates/types/src/session.rs
use serde::{Deserialize, Serialize};

/// A (workspace_path, branch) pair the daemon has seen active.
///
/// Created on first upsert; `last_activity` and `commit_sha` are refreshed
/// on every subsequent event for the same (workspace_path, branch) pair.
/// Never deleted by retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub workspace_path: String,
    pub workspace_name: String,
    pub branch: String,
    pub commit_sha: String,
    pub started_at: i64,
    pub last_activity: i64,
}
