// crates/db/src/queries/sessions.rs
use hookline_types::Session;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{Database, DbResult};

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub workspace_path: String,
    pub workspace_name: String,
    pub branch: String,
    pub commit_sha: String,
    pub started_at: i64,
    pub last_activity: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for SessionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workspace_path: row.try_get("workspace_path")?,
            workspace_name: row.try_get("workspace_name")?,
            branch: row.try_get("branch")?,
            commit_sha: row.try_get("commit_sha")?,
            started_at: row.try_get("started_at")?,
            last_activity: row.try_get("last_activity")?,
        })
    }
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            workspace_path: row.workspace_path,
            workspace_name: row.workspace_name,
            branch: row.branch,
            commit_sha: row.commit_sha,
            started_at: row.started_at,
            last_activity: row.last_activity,
        }
    }
}

/// Inserts or refreshes a (workspace_path, branch) session. On conflict,
/// `last_activity` is set to `now` and `commit_sha` replaced; the id is
/// returned whether a row was inserted or updated, so callers must not
/// infer creation from it.
pub async fn upsert_session(
    db: &Database,
    workspace_path: &str,
    workspace_name: &str,
    branch: &str,
    commit_sha: &str,
    now: i64,
) -> DbResult<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO sessions (workspace_path, workspace_name, branch, commit_sha, started_at, last_activity)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(workspace_path, branch) DO UPDATE SET
               last_activity = excluded.last_activity,
               commit_sha = excluded.commit_sha,
               workspace_name = excluded.workspace_name
           RETURNING id"#,
    )
    .bind(workspace_path)
    .bind(workspace_name)
    .bind(branch)
    .bind(commit_sha)
    .bind(now)
    .bind(now)
    .fetch_one(db.pool())
    .await?;
    Ok(row.0)
}

/// Sessions ordered by most recently active first.
pub async fn sessions(db: &Database, limit: i64) -> DbResult<Vec<SessionRow>> {
    let rows: Vec<SessionRow> = sqlx::query_as(
        "SELECT id, workspace_path, workspace_name, branch, commit_sha, started_at, last_activity
         FROM sessions
         ORDER BY last_activity DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// All session ids, for a bounded sweep (e.g. applying the per-session edit
/// cap to every session each retention tick).
pub async fn all_session_ids(db: &Database) -> DbResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM sessions")
        .fetch_all(db.pool())
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_on_conflict() {
        let db = Database::new_in_memory().await.unwrap();
        let first = upsert_session(&db, "/w", "w", "main", "sha1", 100)
            .await
            .unwrap();
        let second = upsert_session(&db, "/w", "w", "main", "sha2", 200)
            .await
            .unwrap();
        assert_eq!(first, second);

        let rows = sessions(&db, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].commit_sha, "sha2");
        assert_eq!(rows[0].last_activity, 200);
        assert_eq!(rows[0].started_at, 100);
    }

    #[tokio::test]
    async fn distinct_branches_create_distinct_sessions() {
        let db = Database::new_in_memory().await.unwrap();
        let a = upsert_session(&db, "/w", "w", "main", "sha", 100)
            .await
            .unwrap();
        let b = upsert_session(&db, "/w", "w", "feature", "sha", 100)
            .await
            .unwrap();
        assert_ne!(a, b);
    }
}
