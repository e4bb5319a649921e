// crates/db/src/migrations.rs

/// Inline schema migrations, applied in order and tracked in
/// `schema_migrations`. Additive only: new columns get `ALTER TABLE ADD
/// COLUMN`, never a rewrite of an existing one, since the store supports no
/// schema migrations across incompatible versions.
pub const MIGRATIONS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workspace_path TEXT NOT NULL,
        workspace_name TEXT NOT NULL,
        branch TEXT NOT NULL,
        commit_sha TEXT NOT NULL DEFAULT '',
        started_at INTEGER NOT NULL,
        last_activity INTEGER NOT NULL,
        UNIQUE(workspace_path, branch)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS edits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id),
        tool_name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        old_string TEXT NOT NULL DEFAULT '',
        new_string TEXT NOT NULL DEFAULT '',
        line_num INTEGER NOT NULL DEFAULT 0,
        line_count INTEGER NOT NULL DEFAULT 0,
        timestamp INTEGER NOT NULL,
        commit_sha TEXT NOT NULL DEFAULT '',
        vcs_type TEXT NOT NULL DEFAULT '',
        file_snapshot BLOB
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_edits_timestamp ON edits(timestamp)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_edits_file_path ON edits(file_path)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_edits_session_id ON edits(session_id, timestamp)"#,
    r#"CREATE TABLE IF NOT EXISTS prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER REFERENCES sessions(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '[]',
        version INTEGER NOT NULL DEFAULT 1,
        is_global INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(name, session_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_last_activity ON sessions(last_activity)"#,
];
