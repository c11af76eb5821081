//! # Configuration
//!
//! Layered settings for the server and CLI:
//! built-in defaults < TOML file < `SOCIALGRAPH_*` environment variables
//! < command-line flags (applied by the CLI).
//!
//! ## Environment Variables
//!
//! - `SOCIALGRAPH_CONFIG`: path to a TOML file
//! - `SOCIALGRAPH_DB`: database path
//! - `SOCIALGRAPH_BACKEND`: `redb`, `file` or `memory`
//! - `SOCIALGRAPH_FULLTEXT`: `true`/`false`
//! - `SOCIALGRAPH_LOG_FORMAT`: `text` or `json`
//! - `SOCIALGRAPH_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `SOCIALGRAPH_RATE_LIMIT`: requests per second (0 disables)
//! - `SOCIALGRAPH_API_KEY`: bearer key; unset disables authentication

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use socialgraph_core::{Session, SocialError, graph_to_bytes, snapshot_from_bytes};
use std::path::{Path, PathBuf};

/// Default requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Maximum snapshot file size accepted by the file backend (500 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 500 * 1024 * 1024;

// =============================================================================
// ENUMS
// =============================================================================

/// Where the session keeps its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID redb database; every mutation is durable.
    #[default]
    Redb,
    /// SOCG snapshot file rewritten after each mutating command.
    File,
    /// Volatile; nothing is written.
    Memory,
}

impl Backend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Some(Self::Redb),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// =============================================================================
// CONFIG
// =============================================================================

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub backend: Backend,
    pub fulltext: bool,
    pub host: String,
    pub port: u16,
    pub rate_limit: u32,
    pub cors_origins: Option<String>,
    pub api_key: Option<String>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("socialgraph.redb"),
            backend: Backend::Redb,
            fulltext: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
            api_key: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, SocialError> {
        toml::from_str(contents)
            .map_err(|e| SocialError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Defaults, then the TOML file (explicit path or `SOCIALGRAPH_CONFIG`),
    /// then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, SocialError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("SOCIALGRAPH_CONFIG").map(PathBuf::from));

        let mut config = match file {
            Some(file) => {
                let contents = std::fs::read_to_string(&file).map_err(|e| {
                    SocialError::IoError(format!("Read config '{}': {}", file.display(), e))
                })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from `SOCIALGRAPH_*` variables supplied by `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup("SOCIALGRAPH_DB").filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(db);
        }
        if let Some(raw) = lookup("SOCIALGRAPH_BACKEND") {
            match Backend::parse(&raw) {
                Some(backend) => self.backend = backend,
                None => tracing::warn!("Ignoring SOCIALGRAPH_BACKEND='{}'", raw),
            }
        }
        if let Some(raw) = lookup("SOCIALGRAPH_FULLTEXT") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.fulltext = true,
                "0" | "false" | "no" | "off" => self.fulltext = false,
                _ => tracing::warn!("Ignoring SOCIALGRAPH_FULLTEXT='{}'", raw),
            }
        }
        if let Some(raw) = lookup("SOCIALGRAPH_LOG_FORMAT") {
            self.log_format = if raw.eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Text
            };
        }
        if let Some(origins) = lookup("SOCIALGRAPH_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Some(raw) = lookup("SOCIALGRAPH_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(rps) => self.rate_limit = rps,
                Err(_) => tracing::warn!("Ignoring SOCIALGRAPH_RATE_LIMIT='{}'", raw),
            }
        }
        if let Some(key) = lookup("SOCIALGRAPH_API_KEY") {
            self.api_key = Some(key);
        }
        self.api_key = self.api_key.take().filter(|k| !k.is_empty());
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Open the session described by this configuration.
    pub fn open_session(&self) -> Result<Session, SocialError> {
        match self.backend {
            Backend::Redb => Session::with_redb(&self.database, self.fulltext),
            Backend::Memory => Ok(Session::new(self.fulltext)),
            Backend::File => {
                if !self.database.exists() {
                    return Ok(Session::new(self.fulltext));
                }
                let data = read_snapshot_file(&self.database)?;
                let snapshot = snapshot_from_bytes(&data)?;
                let mut session = Session::new(self.fulltext);
                session.restore(snapshot)?;
                Ok(session)
            }
        }
    }

    /// Write the session back when the backend needs an explicit save.
    pub fn save_session(&self, session: &Session) -> Result<(), SocialError> {
        match self.backend {
            Backend::Redb | Backend::Memory => Ok(()),
            Backend::File => {
                let data = graph_to_bytes(session.graph())?;
                std::fs::write(&self.database, &data)
                    .map_err(|e| SocialError::IoError(format!("Write db: {}", e)))
            }
        }
    }
}

/// Read a snapshot file after checking its size.
pub fn read_snapshot_file(path: &Path) -> Result<Vec<u8>, SocialError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SocialError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
        return Err(SocialError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SNAPSHOT_FILE_SIZE
        )));
    }
    std::fs::read(path).map_err(|e| SocialError::IoError(format!("Read file: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use socialgraph_core::NewUser;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            database = "data/graph.redb"
            backend = "memory"
            fulltext = false
            port = 9000
            "#,
        )
        .expect("parse");

        assert_eq!(config.database, PathBuf::from("data/graph.redb"));
        assert_eq!(config.backend, Backend::Memory);
        assert!(!config.fulltext);
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.rate_limit, DEFAULT_RATE_LIMIT);
    }

    #[test]
    fn env_overrides_toml() {
        let mut config = Config::from_toml_str("backend = \"memory\"").expect("parse");
        config.apply_env(env(&[
            ("SOCIALGRAPH_BACKEND", "file"),
            ("SOCIALGRAPH_FULLTEXT", "off"),
            ("SOCIALGRAPH_RATE_LIMIT", "0"),
            ("SOCIALGRAPH_LOG_FORMAT", "JSON"),
            ("SOCIALGRAPH_API_KEY", "k3y"),
        ]));

        assert_eq!(config.backend, Backend::File);
        assert!(!config.fulltext);
        assert_eq!(config.rate_limit, 0);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.api_key.as_deref(), Some("k3y"));
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("SOCIALGRAPH_BACKEND", "postgres"),
            ("SOCIALGRAPH_RATE_LIMIT", "fast"),
            ("SOCIALGRAPH_API_KEY", ""),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::from_toml_str("port = \"eighty\"").is_err());
    }

    #[test]
    fn file_backend_roundtrip() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = Config {
            database: temp.path().join("graph.socg"),
            backend: Backend::File,
            ..Config::default()
        };

        let mut session = config.open_session().expect("open");
        session
            .register(&NewUser::new("alice", "Alice", "alice@example.com", ""))
            .expect("register");
        config.save_session(&session).expect("save");

        let reopened = config.open_session().expect("reopen");
        assert_eq!(reopened.stats().user_count, 1);
        assert!(!reopened.is_persistent());
    }
}
