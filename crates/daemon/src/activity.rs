// crates/daemon/src/activity.rs
use std::collections::HashMap;
use std::sync::Arc;

use hookline_types::WorkspaceActivity;
use tokio::sync::RwLock;

/// Concurrent, path-keyed map of in-memory workspace activity. Readers
/// (status queries) take a shared snapshot; the pipeline holds an exclusive
/// lock only for the O(1) per-event update. No eviction: entries accumulate
/// for the process lifetime and are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    inner: Arc<RwLock<HashMap<String, WorkspaceActivity>>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates the entry for `workspace_path`, refreshing
    /// `last_activity` and incrementing the relevant counter.
    pub async fn tick(
        &self,
        workspace_path: &str,
        workspace_name: &str,
        branch: &str,
        now: i64,
        is_edit: bool,
        is_prompt: bool,
    ) {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entry(workspace_path.to_string())
            .or_insert_with(|| WorkspaceActivity {
                workspace_path: workspace_path.to_string(),
                workspace_name: workspace_name.to_string(),
                branch: branch.to_string(),
                last_activity: now,
                edit_count: 0,
                prompt_count: 0,
            });
        entry.workspace_name = workspace_name.to_string();
        entry.branch = branch.to_string();
        entry.last_activity = now;
        if is_edit {
            entry.edit_count += 1;
        }
        if is_prompt {
            entry.prompt_count += 1;
        }
    }

    pub async fn snapshot(&self) -> HashMap<String, WorkspaceActivity> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, workspace_path: &str) -> Option<WorkspaceActivity> {
        self.inner.read().await.get(workspace_path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_tick_creates_entry() {
        let tracker = ActivityTracker::new();
        tracker.tick("/w", "w", "main", 100, true, false).await;
        let entry = tracker.get("/w").await.unwrap();
        assert_eq!(entry.edit_count, 1);
        assert_eq!(entry.prompt_count, 0);
        assert_eq!(entry.last_activity, 100);
    }

    #[tokio::test]
    async fn subsequent_ticks_accumulate() {
        let tracker = ActivityTracker::new();
        tracker.tick("/w", "w", "main", 100, true, false).await;
        tracker.tick("/w", "w", "main", 200, true, false).await;
        tracker.tick("/w", "w", "main", 300, false, true).await;

        let entry = tracker.get("/w").await.unwrap();
        assert_eq!(entry.edit_count, 2);
        assert_eq!(entry.prompt_count, 1);
        assert_eq!(entry.last_activity, 300);
    }

    #[tokio::test]
    async fn unknown_path_has_no_entry() {
        let tracker = ActivityTracker::new();
        assert!(tracker.get("/nope").await.is_none());
    }
}
