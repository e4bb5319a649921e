// crates/types/src/activity.rs
use serde::{Deserialize, Serialize};

/// Snapshot of a workspace's in-memory activity, as tracked by the daemon
/// and reported in status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceActivity {
    pub workspace_path: String,
    pub workspace_name: String,
    pub branch: String,
    pub last_activity: i64,
    pub edit_count: u64,
    pub prompt_count: u64,
}
