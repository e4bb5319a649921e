// crates/types/src/query.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activity::WorkspaceActivity;
use crate::edit::Edit;
use crate::prompt::Prompt;
use crate::session::Session;

/// A request read off the query endpoint.
///
/// `kind` is deliberately a raw string rather than an enum: an unrecognized
/// value is a dispatch-time `Invalid` response, not a framing error, so it
/// must deserialize successfully and be rejected downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub workspace_path: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusPayload {
    pub running: bool,
    pub uptime_ms: i64,
    pub workspaces: BTreeMap<String, WorkspaceActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_workspace: Option<WorkspaceActivity>,
}

/// A response written back on the query endpoint.
///
/// Collection fields are always present (default empty) rather than
/// `Option`, so callers don't need to distinguish "no results" from
/// "field omitted"; `status` and `error` are the exception since at most
/// one query kind ever populates them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn empty(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            edits: Vec::new(),
            prompts: Vec::new(),
            sessions: Vec::new(),
            status: None,
            error: None,
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(kind)
        }
    }
}
