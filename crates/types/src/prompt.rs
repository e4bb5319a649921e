// crates/types/src/prompt.rs
use serde::{Deserialize, Serialize};

/// A saved prompt template, global or scoped to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub session_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub version: i64,
    pub is_global: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
