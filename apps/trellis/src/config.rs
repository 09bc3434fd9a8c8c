//! # Configuration
//!
//! Settings are resolved in order, first match wins:
//! 1. command-line flags (`--backend`, `--database`)
//! 2. environment (`TRELLIS_BACKEND`, `TRELLIS_DATABASE`, `TRELLIS_LOG_FORMAT`)
//! 3. the TOML file given with `--config`
//! 4. built-in defaults
//!
//! ```toml
//! backend = "redb"
//! database = "data/store.redb"
//! log_format = "json"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use trellis_core::{TrellisError, TrellisResult};

/// Backend used when nothing else selects one.
pub const DEFAULT_BACKEND: &str = "redb";

/// Database path used when nothing else selects one.
pub const DEFAULT_DATABASE: &str = "trellis.redb";

pub const ENV_BACKEND: &str = "TRELLIS_BACKEND";
pub const ENV_DATABASE: &str = "TRELLIS_DATABASE";
pub const ENV_LOG_FORMAT: &str = "TRELLIS_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` selects JSON; anything else is text.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub backend: Option<String>,
    pub database: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
}

impl FileConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> TrellisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrellisError::Resource(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> TrellisResult<Self> {
        toml::from_str(content).map_err(|e| {
            TrellisError::InvalidArgument(format!("Failed to parse config file: {}", e))
        })
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: String,
    pub database: PathBuf,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            database: PathBuf::from(DEFAULT_DATABASE),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Merge flags, environment, file and defaults.
    ///
    /// `env` looks up an environment variable; passing a closure keeps the
    /// merge testable without touching the process environment.
    pub fn resolve(
        backend: Option<&str>,
        database: Option<&Path>,
        file: &FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();

        let backend = backend
            .map(str::to_string)
            .or_else(|| env(ENV_BACKEND))
            .or_else(|| file.backend.clone())
            .unwrap_or(defaults.backend);

        let database = database
            .map(Path::to_path_buf)
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| file.database.clone())
            .unwrap_or(defaults.database);

        let log_format = env(ENV_LOG_FORMAT)
            .map(|name| LogFormat::from_name(&name))
            .or(file.log_format)
            .unwrap_or(defaults.log_format);

        Self {
            backend,
            database,
            log_format,
        }
    }

    /// Resolve against the real process environment, reading `config` if given.
    pub fn load(
        backend: Option<&str>,
        database: Option<&Path>,
        config: Option<&Path>,
    ) -> TrellisResult<Self> {
        let file = match config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(backend, database, &file, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        }))
    }

    /// Database path as a backend identifier.
    pub fn identifier(&self) -> TrellisResult<&str> {
        self.database.to_str().ok_or_else(|| {
            TrellisError::InvalidArgument(format!(
                "database path {} is not valid UTF-8",
                self.database.display()
            ))
        })
    }

    /// Base name for model index files: the database path without extension.
    pub fn model_base(&self) -> TrellisResult<String> {
        let base = self.database.with_extension("");
        base.to_str().map(str::to_string).ok_or_else(|| {
            TrellisError::InvalidArgument(format!(
                "database path {} is not valid UTF-8",
                self.database.display()
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_nothing_set() {
        let settings = Settings::resolve(None, None, &FileConfig::default(), no_env);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.backend, "redb");
    }

    #[test]
    fn file_overrides_defaults() {
        let file = FileConfig::parse(
            "backend = \"memory\"\ndatabase = \"x.redb\"\nlog_format = \"json\"\n",
        )
        .expect("parse");
        let settings = Settings::resolve(None, None, &file, no_env);
        assert_eq!(settings.backend, "memory");
        assert_eq!(settings.database, PathBuf::from("x.redb"));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let file = FileConfig {
            backend: Some("memory".to_string()),
            database: Some(PathBuf::from("file.redb")),
            log_format: Some(LogFormat::Json),
        };
        let env: BTreeMap<&str, &str> = [
            (ENV_BACKEND, "env-backend"),
            (ENV_DATABASE, "env.redb"),
            (ENV_LOG_FORMAT, "text"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let settings = Settings::resolve(None, None, &file, lookup);
        assert_eq!(settings.backend, "env-backend");
        assert_eq!(settings.database, PathBuf::from("env.redb"));
        assert_eq!(settings.log_format, LogFormat::Text);

        let settings = Settings::resolve(Some("flag"), Some(Path::new("flag.redb")), &file, lookup);
        assert_eq!(settings.backend, "flag");
        assert_eq!(settings.database, PathBuf::from("flag.redb"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = FileConfig::parse("backnd = \"memory\"");
        assert!(matches!(result, Err(TrellisError::InvalidArgument(_))));
    }

    #[test]
    fn model_base_strips_extension() {
        let settings = Settings {
            database: PathBuf::from("data/store.redb"),
            ..Settings::default()
        };
        assert_eq!(settings.model_base().expect("base"), "data/store");
    }
}
