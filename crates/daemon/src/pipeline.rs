// crates/daemon/src/pipeline.rs
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hookline_core::{compress, workspace_filter, Config, Error};
use hookline_db::queries::edits::{self, NewEdit};
use hookline_db::queries::prompts;
use hookline_db::queries::sessions;
use hookline_db::Database;
use hookline_types::IncomingEvent;
use tracing::warn;

use crate::activity::ActivityTracker;
use crate::event_bus::EventBus;

#[derive(Clone)]
pub struct Pipeline {
    db: Arc<Database>,
    config: Arc<Config>,
    activity: ActivityTracker,
    event_bus: EventBus,
}

impl Pipeline {
    pub fn new(db: Arc<Database>, config: Arc<Config>, activity: ActivityTracker, event_bus: EventBus) -> Self {
        Self { db, config, activity, event_bus }
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    /// Runs one event through filter, activity tick, session upsert, and
    /// type-specific dispatch. Filtered-out events are acknowledged as
    /// success with no state change, per the producer contract: producers
    /// cannot distinguish "stored" from "intentionally dropped."
    pub async fn process(&self, event: IncomingEvent) -> Result<(), Error> {
        let workspace_path = event.workspace.clone().unwrap_or_default();
        if workspace_path.is_empty() {
            return Err(Error::invalid("event missing workspace"));
        }

        if !workspace_filter::is_allowed(
            &workspace_path,
            &self.config.workspaces.tracked,
            &self.config.workspaces.ignored,
        ) {
            return Ok(());
        }

        let now = now_ts();
        let workspace_name = event.workspace_name.clone().unwrap_or_default();
        let branch = event.branch.clone().unwrap_or_default();
        let commit_sha = event.commit_sha.clone().unwrap_or_default();
        let vcs_type = event.vcs_type.clone().unwrap_or_default();

        let is_edit = event.kind == "edit";
        let is_prompt = event.kind == "prompt";

        self.activity
            .tick(&workspace_path, &workspace_name, &branch, now, is_edit, is_prompt)
            .await;

        let session_id = sessions::upsert_session(
            &self.db,
            &workspace_path,
            &workspace_name,
            &branch,
            &commit_sha,
            now,
        )
        .await
        .map_err(|err| err.classify())?;

        let outcome = match event.kind.as_str() {
            "edit" => self.handle_edit(&event, session_id, &commit_sha, &vcs_type, now).await,
            "prompt" => self.handle_prompt(&event, session_id, now).await,
            other => Err(Error::invalid(format!("unknown event type: {other}"))),
        };

        if outcome.is_ok() {
            self.notify_event_bus(&workspace_path, &event).await;
        }
        outcome
    }

    async fn notify_event_bus(&self, workspace_path: &str, event: &IncomingEvent) {
        let payload = serde_json::json!({
            "type": event.kind,
            "workspace": workspace_path,
            "file_path": event.file_path,
        });
        if let Ok(bytes) = serde_json::to_vec(&payload) {
            self.event_bus.notify(workspace_path, &bytes).await;
        }
    }

    async fn handle_edit(
        &self,
        event: &IncomingEvent,
        session_id: i64,
        commit_sha: &str,
        vcs_type: &str,
        now: i64,
    ) -> Result<(), Error> {
        let snapshot = match &event.file_content_b64 {
            Some(encoded) if !encoded.is_empty() => decode_and_compress(encoded),
            _ => Vec::new(),
        };

        let edit = NewEdit {
            session_id,
            tool_name: event.tool_name.clone().unwrap_or_default(),
            file_path: event.file_path.clone().unwrap_or_default(),
            old_string: event.old_string.clone().unwrap_or_default(),
            new_string: event.new_string.clone().unwrap_or_default(),
            line_num: event.line_num.unwrap_or(0),
            line_count: event.line_count.unwrap_or(0),
            commit_sha: commit_sha.to_string(),
            vcs_type: vcs_type.to_string(),
            file_snapshot: snapshot,
        };

        edits::record_edit(&self.db, &edit, now)
            .await
            .map(|_| ())
            .map_err(|err| err.classify())
    }

    async fn handle_prompt(
        &self,
        event: &IncomingEvent,
        session_id: i64,
        now: i64,
    ) -> Result<(), Error> {
        let name = event.prompt_name.clone().unwrap_or_default();
        let description = event.prompt_description.clone().unwrap_or_default();
        let content = event.new_string.clone().unwrap_or_default();
        let tags = event.prompt_tags.clone().unwrap_or_default();

        prompts::record_prompt(
            &self.db,
            Some(session_id),
            &name,
            &description,
            &content,
            &tags,
            false,
            now,
        )
        .await
        .map(|_| ())
        .map_err(|err| err.classify())
    }
}

fn decode_and_compress(encoded: &str) -> Vec<u8> {
    match BASE64.decode(encoded) {
        Ok(bytes) => match compress::gzip(&bytes) {
            Ok(compressed) => compressed,
            Err(err) => {
                warn!(error = %err, "snapshot compression failed, storing empty snapshot");
                Vec::new()
            }
        },
        Err(err) => {
            warn!(error = %err, "snapshot base64 decode failed, storing empty snapshot");
            Vec::new()
        }
    }
}

pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
