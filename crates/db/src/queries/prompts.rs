// crates/db/src/queries/prompts.rs
use hookline_types::Prompt;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{Database, DbResult};

#[derive(Debug, Clone)]
pub struct PromptRow {
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

impl<'r> sqlx::FromRow<'r, SqliteRow> for PromptRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let tags_json: String = row.try_get("tags")?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
        let is_global: i64 = row.try_get("is_global")?;
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            content: row.try_get("content")?,
            tags,
            version: row.try_get("version")?,
            is_global: is_global != 0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<PromptRow> for Prompt {
    fn from(row: PromptRow) -> Self {
        Prompt {
            id: row.id,
            session_id: row.session_id,
            name: row.name,
            description: row.description,
            content: row.content,
            tags: row.tags,
            version: row.version,
            is_global: row.is_global,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Inserts or updates a prompt keyed on (name, session_id). SQLite's UNIQUE
/// constraint treats NULL session_id values as distinct from one another,
/// so the (name, NULL) case is resolved with an explicit lookup rather than
/// `ON CONFLICT`.
pub async fn record_prompt(
    db: &Database,
    session_id: Option<i64>,
    name: &str,
    description: &str,
    content: &str,
    tags: &[String],
    is_global: bool,
    now: i64,
) -> DbResult<i64> {
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());

    let existing: Option<(i64,)> = match session_id {
        Some(sid) => {
            sqlx::query_as("SELECT id FROM prompts WHERE name = ? AND session_id = ?")
                .bind(name)
                .bind(sid)
                .fetch_optional(db.pool())
                .await?
        }
        None => {
            sqlx::query_as("SELECT id FROM prompts WHERE name = ? AND session_id IS NULL")
                .bind(name)
                .fetch_optional(db.pool())
                .await?
        }
    };

    if let Some((id,)) = existing {
        sqlx::query(
            r#"UPDATE prompts SET
                description = ?, content = ?, tags = ?, version = version + 1, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(description)
        .bind(content)
        .bind(&tags_json)
        .bind(now)
        .bind(id)
        .execute(db.pool())
        .await?;
        Ok(id)
    } else {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO prompts
               (session_id, name, description, content, tags, version, is_global, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(session_id)
        .bind(name)
        .bind(description)
        .bind(content)
        .bind(&tags_json)
        .bind(is_global)
        .bind(now)
        .bind(now)
        .fetch_one(db.pool())
        .await?;
        Ok(row.0)
    }
}

/// Prompts whose name contains `name_pattern` as a substring (empty pattern
/// matches all), newest first.
pub async fn prompts(db: &Database, name_pattern: &str, limit: i64) -> DbResult<Vec<PromptRow>> {
    let like = format!("%{}%", name_pattern.replace('%', "\\%").replace('_', "\\_"));
    let rows: Vec<PromptRow> = sqlx::query_as(
        r#"SELECT id, session_id, name, description, content, tags, version, is_global,
                  created_at, updated_at
           FROM prompts
           WHERE name LIKE ? ESCAPE '\'
           ORDER BY updated_at DESC
           LIMIT ?"#,
    )
    .bind(like)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}
