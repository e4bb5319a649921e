// crates/core/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

const CONFIG_ENV_DATA_DIR: &str = "HOOKLINE_DATA_DIR";
const CONFIG_ENV_INGEST_SOCKET: &str = "HOOKLINE_INGEST_SOCKET";
const CONFIG_ENV_QUERY_SOCKET: &str = "HOOKLINE_QUERY_SOCKET";

#[derive(Debug, Clone)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub database: DatabaseConfig,
    pub sockets: SocketsConfig,
    pub query: QueryConfig,
    pub retention: RetentionConfig,
    pub backup: BackupConfig,
    pub workspaces: WorkspacesConfig,
    pub hooks: HooksConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct SocketsConfig {
    pub ingest_path: PathBuf,
    pub query_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub retention_days: i64,
    pub max_edits_per_session: i64,
    pub max_db_size_mb: i64,
    pub auto_vacuum: bool,
    pub cleanup_interval_hours: i64,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub enabled: bool,
    pub format: String,
    pub interval_hours: i64,
    pub retention_days: i64,
    pub dir: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspacesConfig {
    pub tracked: Vec<String>,
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HooksConfig {
    pub max_event_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig {
                data_dir: default_data_dir(),
            },
            database: DatabaseConfig {
                filename: "hookline.db".to_string(),
            },
            sockets: SocketsConfig {
                ingest_path: PathBuf::from("/tmp/hookline-daemon.sock"),
                query_path: PathBuf::from("/tmp/hookline-query.sock"),
            },
            query: QueryConfig {
                default_limit: 50,
                max_limit: 500,
            },
            retention: RetentionConfig {
                retention_days: 90,
                max_edits_per_session: 5_000,
                max_db_size_mb: 500,
                auto_vacuum: false,
                cleanup_interval_hours: 24,
            },
            backup: BackupConfig {
                enabled: false,
                format: "sqlite".to_string(),
                interval_hours: 24,
                retention_days: 30,
                dir: "backups".to_string(),
            },
            workspaces: WorkspacesConfig::default(),
            hooks: HooksConfig {
                max_event_bytes: 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            performance: PerformanceConfig {
                max_connections: 256,
            },
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hookline")
}

/// Mirrors `Config` but every field is optional, the shape that round-trips
/// through an on-disk TOML file that may only set a subset of keys.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    directory: FileDirectory,
    #[serde(default)]
    database: FileDatabase,
    #[serde(default)]
    sockets: FileSockets,
    #[serde(default)]
    query: FileQuery,
    #[serde(default)]
    retention: FileRetention,
    #[serde(default)]
    backup: FileBackup,
    #[serde(default)]
    workspaces: FileWorkspaces,
    #[serde(default)]
    hooks: FileHooks,
    #[serde(default)]
    logging: FileLogging,
    #[serde(default)]
    performance: FilePerformance,
}

#[derive(Debug, Default, Deserialize)]
struct FileDirectory {
    data_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSockets {
    ingest_path: Option<String>,
    query_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileQuery {
    default_limit: Option<i64>,
    max_limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileRetention {
    retention_days: Option<i64>,
    max_edits_per_session: Option<i64>,
    max_db_size_mb: Option<i64>,
    auto_vacuum: Option<bool>,
    cleanup_interval_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileBackup {
    enabled: Option<bool>,
    format: Option<String>,
    interval_hours: Option<i64>,
    retention_days: Option<i64>,
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileWorkspaces {
    #[serde(default)]
    tracked: Vec<String>,
    #[serde(default)]
    ignored: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileHooks {
    max_event_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilePerformance {
    max_connections: Option<usize>,
}

impl Config {
    /// The fixed on-disk location of the config file, `~/.config/hookline/config.toml`.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hookline")
            .join("config.toml")
    }

    /// Loads config following the layering order: built-in defaults, then
    /// the on-disk file if present, then a handful of environment variable
    /// overrides, then path normalization, then validation.
    ///
    /// A missing file is not an error. Invalid TOML syntax falls back to
    /// defaults with a logged warning. A value that parses but fails
    /// validation aborts startup via `Error::Config`.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(None)
    }

    /// Same layering as [`Config::load`], but reads the config file from
    /// `path_override` instead of the fixed [`Config::config_path`]
    /// location, for the daemon binary's `--config` flag.
    pub fn load_from(path_override: Option<PathBuf>) -> Result<Self, Error> {
        let file = Self::load_file_config(path_override.as_deref());
        let mut config = Self::default();
        config.apply_file(file);
        config.apply_env();
        config.normalize_paths();
        config.validate()?;
        Ok(config)
    }

    fn load_file_config(path_override: Option<&Path>) -> FileConfig {
        let owned;
        let path = match path_override {
            Some(p) => p,
            None => {
                owned = Self::config_path();
                &owned
            }
        };
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return FileConfig::default(),
        };
        match toml::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "invalid config file, using defaults");
                FileConfig::default()
            }
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.directory.data_dir {
            self.directory.data_dir = PathBuf::from(v);
        }
        if let Some(v) = file.database.filename {
            self.database.filename = v;
        }
        if let Some(v) = file.sockets.ingest_path {
            self.sockets.ingest_path = PathBuf::from(v);
        }
        if let Some(v) = file.sockets.query_path {
            self.sockets.query_path = PathBuf::from(v);
        }
        if let Some(v) = file.query.default_limit {
            self.query.default_limit = v;
        }
        if let Some(v) = file.query.max_limit {
            self.query.max_limit = v;
        }
        if let Some(v) = file.retention.retention_days {
            self.retention.retention_days = v;
        }
        if let Some(v) = file.retention.max_edits_per_session {
            self.retention.max_edits_per_session = v;
        }
        if let Some(v) = file.retention.max_db_size_mb {
            self.retention.max_db_size_mb = v;
        }
        if let Some(v) = file.retention.auto_vacuum {
            self.retention.auto_vacuum = v;
        }
        if let Some(v) = file.retention.cleanup_interval_hours {
            self.retention.cleanup_interval_hours = v;
        }
        if let Some(v) = file.backup.enabled {
            self.backup.enabled = v;
        }
        if let Some(v) = file.backup.format {
            self.backup.format = v;
        }
        if let Some(v) = file.backup.interval_hours {
            self.backup.interval_hours = v;
        }
        if let Some(v) = file.backup.retention_days {
            self.backup.retention_days = v;
        }
        if let Some(v) = file.backup.dir {
            self.backup.dir = v;
        }
        if !file.workspaces.tracked.is_empty() {
            self.workspaces.tracked = file.workspaces.tracked;
        }
        if !file.workspaces.ignored.is_empty() {
            self.workspaces.ignored = file.workspaces.ignored;
        }
        if let Some(v) = file.hooks.max_event_bytes {
            self.hooks.max_event_bytes = v;
        }
        if let Some(v) = file.logging.level {
            self.logging.level = v;
        }
        if let Some(v) = file.logging.file {
            self.logging.file = Some(PathBuf::from(v));
        }
        if let Some(v) = file.performance.max_connections {
            self.performance.max_connections = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var(CONFIG_ENV_DATA_DIR) {
            self.directory.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var(CONFIG_ENV_INGEST_SOCKET) {
            self.sockets.ingest_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var(CONFIG_ENV_QUERY_SOCKET) {
            self.sockets.query_path = PathBuf::from(v);
        }
    }

    fn normalize_paths(&mut self) {
        self.directory.data_dir = expand_and_absolutize(&self.directory.data_dir);
        self.sockets.ingest_path = expand_and_absolutize(&self.sockets.ingest_path);
        self.sockets.query_path = expand_and_absolutize(&self.sockets.query_path);
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(expand_and_absolutize(file));
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.query.default_limit <= 0 || self.query.max_limit <= 0 {
            return Err(Error::config("query.default_limit and query.max_limit must be positive"));
        }
        if self.query.default_limit > self.query.max_limit {
            return Err(Error::config("query.default_limit must be <= query.max_limit"));
        }
        if self.retention.retention_days < 0 {
            return Err(Error::config("retention.retention_days must be >= 0"));
        }
        if self.retention.max_edits_per_session <= 0 {
            return Err(Error::config("retention.max_edits_per_session must be > 0"));
        }
        if self.backup.enabled && !matches!(self.backup.format.as_str(), "sqlite" | "export") {
            return Err(Error::config("backup.format must be 'sqlite' or 'export'"));
        }
        if !matches!(self.logging.level.as_str(), "debug" | "info" | "warn" | "error") {
            return Err(Error::config("logging.level must be one of debug/info/warn/error"));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.directory.data_dir.join(&self.database.filename)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.directory.data_dir.join(&self.backup.dir)
    }
}

fn expand_and_absolutize(path: &Path) -> PathBuf {
    let expanded = if let Ok(rest) = path.strip_prefix("~") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        path.to_path_buf()
    };
    if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_limits() {
        let mut config = Config::default();
        config.query.default_limit = 100;
        config.query.max_limit = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_backup_format() {
        let mut config = Config::default();
        config.backup.enabled = true;
        config.backup.format = "zip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = Config::default();
        config.logging.level = "trace".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn tilde_expands_against_home() {
        let home = dirs::home_dir().expect("home dir available in test env");
        let expanded = expand_and_absolutize(Path::new("~/hookline-test"));
        assert_eq!(expanded, home.join("hookline-test"));
    }
}
