// crates/types/src/event.rs
use serde::{Deserialize, Serialize};

/// A raw record read off the ingest endpoint, before validation.
///
/// Mirrors the producer's hook-event shape: every field beyond `kind` is
/// optional and defaults away, since edit events and prompt events each
/// populate only the subset relevant to them, and producers are expected
/// to add fields over time without breaking older daemon builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub vcs_type: Option<String>,

    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub old_string: Option<String>,
    #[serde(default)]
    pub new_string: Option<String>,
    #[serde(default)]
    pub file_content_b64: Option<String>,
    #[serde(default)]
    pub line_num: Option<i64>,
    #[serde(default)]
    pub line_count: Option<i64>,

    #[serde(default)]
    pub prompt_name: Option<String>,
    #[serde(default)]
    pub prompt_description: Option<String>,
    #[serde(default)]
    pub prompt_tags: Option<Vec<String>>,
}
