// crates/db/src/queries/edits.rs
use hookline_types::Edit;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{Database, DbResult};

/// A new edit to append. `file_snapshot` carries the already gzip-compressed
/// bytes; the store never inspects them.
#[derive(Debug, Clone)]
pub struct NewEdit {
    pub session_id: i64,
    pub tool_name: String,
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
    pub line_num: i64,
    pub line_count: i64,
    pub commit_sha: String,
    pub vcs_type: String,
    pub file_snapshot: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EditRow {
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
    pub file_snapshot: Option<Vec<u8>>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for EditRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            tool_name: row.try_get("tool_name")?,
            file_path: row.try_get("file_path")?,
            old_string: row.try_get("old_string")?,
            new_string: row.try_get("new_string")?,
            line_num: row.try_get("line_num")?,
            line_count: row.try_get("line_count")?,
            timestamp: row.try_get("timestamp")?,
            commit_sha: row.try_get("commit_sha")?,
            vcs_type: row.try_get("vcs_type")?,
            file_snapshot: row.try_get("file_snapshot")?,
        })
    }
}

impl EditRow {
    /// Converts to the wire type, optionally attaching the decompressed
    /// snapshot as base64 when the caller asked for it.
    pub fn into_wire(self, file_content_b64: Option<String>) -> Edit {
        Edit {
            id: self.id,
            session_id: self.session_id,
            tool_name: self.tool_name,
            file_path: self.file_path,
            old_string: self.old_string,
            new_string: self.new_string,
            line_num: self.line_num,
            line_count: self.line_count,
            timestamp: self.timestamp,
            commit_sha: self.commit_sha,
            vcs_type: self.vcs_type,
            file_content_b64,
        }
    }
}

/// Appends one edit row. `timestamp` is assigned by the caller (the store's
/// clock) when the producer did not set one.
pub async fn record_edit(db: &Database, edit: &NewEdit, timestamp: i64) -> DbResult<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO edits
           (session_id, tool_name, file_path, old_string, new_string, line_num, line_count,
            timestamp, commit_sha, vcs_type, file_snapshot)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           RETURNING id"#,
    )
    .bind(edit.session_id)
    .bind(&edit.tool_name)
    .bind(&edit.file_path)
    .bind(&edit.old_string)
    .bind(&edit.new_string)
    .bind(edit.line_num)
    .bind(edit.line_count)
    .bind(timestamp)
    .bind(&edit.commit_sha)
    .bind(&edit.vcs_type)
    .bind(&edit.file_snapshot)
    .fetch_one(db.pool())
    .await?;
    Ok(row.0)
}

pub async fn recent_edits(db: &Database, limit: i64) -> DbResult<Vec<EditRow>> {
    let rows: Vec<EditRow> = sqlx::query_as(
        "SELECT id, session_id, tool_name, file_path, old_string, new_string, line_num,
                line_count, timestamp, commit_sha, vcs_type, file_snapshot
         FROM edits
         ORDER BY timestamp DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

pub async fn edits_by_file(db: &Database, file_path: &str, limit: i64) -> DbResult<Vec<EditRow>> {
    let rows: Vec<EditRow> = sqlx::query_as(
        "SELECT id, session_id, tool_name, file_path, old_string, new_string, line_num,
                line_count, timestamp, commit_sha, vcs_type, file_snapshot
         FROM edits
         WHERE file_path = ?
         ORDER BY timestamp DESC
         LIMIT ?",
    )
    .bind(file_path)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

pub async fn edits_by_workspace(
    db: &Database,
    workspace_path: &str,
    limit: i64,
) -> DbResult<Vec<EditRow>> {
    let rows: Vec<EditRow> = sqlx::query_as(
        "SELECT e.id, e.session_id, e.tool_name, e.file_path, e.old_string, e.new_string,
                e.line_num, e.line_count, e.timestamp, e.commit_sha, e.vcs_type, e.file_snapshot
         FROM edits e
         JOIN sessions s ON s.id = e.session_id
         WHERE s.workspace_path = ?
         ORDER BY e.timestamp DESC
         LIMIT ?",
    )
    .bind(workspace_path)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Deletes edits older than `cutoff`. No cascade needed: no rows depend on
/// edits.
pub async fn delete_edits_before(db: &Database, cutoff: i64) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM edits WHERE timestamp < ?")
        .bind(cutoff)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected())
}

/// Deletes all but the newest `max` edits for `session_id`, oldest first.
pub async fn cap_session_edits(db: &Database, session_id: i64, max: i64) -> DbResult<u64> {
    let result = sqlx::query(
        r#"DELETE FROM edits
           WHERE session_id = ? AND id NOT IN (
               SELECT id FROM edits
               WHERE session_id = ?
               ORDER BY timestamp DESC
               LIMIT ?
           )"#,
    )
    .bind(session_id)
    .bind(session_id)
    .bind(max)
    .execute(db.pool())
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::upsert_session;

    fn sample(session_id: i64) -> NewEdit {
        NewEdit {
            session_id,
            tool_name: "Edit".to_string(),
            file_path: "/w/main.x".to_string(),
            old_string: "a".to_string(),
            new_string: "b".to_string(),
            line_num: 10,
            line_count: 5,
            commit_sha: String::new(),
            vcs_type: String::new(),
            file_snapshot: Vec::new(),
        }
    }

    #[tokio::test]
    async fn round_trips_basic_fields() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = upsert_session(&db, "/w", "w", "main", "", 1).await.unwrap();
        record_edit(&db, &sample(session_id), 100).await.unwrap();

        let rows = recent_edits(&db, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_path, "/w/main.x");
        assert_eq!(rows[0].old_string, "a");
        assert_eq!(rows[0].new_string, "b");
        assert_eq!(rows[0].line_num, 10);
        assert_eq!(rows[0].line_count, 5);
    }

    #[tokio::test]
    async fn delete_before_cutoff_spares_newer_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = upsert_session(&db, "/w", "w", "main", "", 1).await.unwrap();
        record_edit(&db, &sample(session_id), 100).await.unwrap();
        record_edit(&db, &sample(session_id), 200).await.unwrap();

        let deleted = delete_edits_before(&db, 150).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = recent_edits(&db, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp, 200);
    }

    #[tokio::test]
    async fn cap_session_edits_keeps_only_the_newest() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = upsert_session(&db, "/w", "w", "main", "", 1).await.unwrap();
        for ts in [100, 200, 300] {
            record_edit(&db, &sample(session_id), ts).await.unwrap();
        }

        let deleted = cap_session_edits(&db, session_id, 1).await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = recent_edits(&db, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp, 300);
    }
}
