// crates/types/src/edit.rs
use serde::{Deserialize, Serialize};

/// One tool-invoked file modification, as surfaced to query consumers.
///
/// `file_content` carries the decompressed snapshot (base64, for JSON
/// transport) only when the query explicitly asked for it; the store only
/// ever holds the gzip-compressed bytes, and decompression happens at the
/// query boundary, never inside the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    pub id: i64,
    pub session_id: i64,
    pub tool_name: String,
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
    pub line_num: i64,
    pub line_count: i64,
    pub timestamp: i64,
    pub commit_sha: String,
    pub vcs_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content_b64: Option<String>,
}
