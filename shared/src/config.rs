//! Persisted settings, credential lookup, and source aliases.
//!
//! Settings live in `~/.loq/config.json` with camelCase keys. A missing
//! file means defaults; the file is rewritten whole on every change.
//! Credentials never touch the file: the sources API token and the query
//! endpoint credentials come from environment variables only.

use crate::format::OutputFormat;
use crate::query::DEFAULT_LIMIT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Query endpoint used when neither the environment nor the config file
/// names one.
pub const DEFAULT_QUERY_BASE_URL: &str = "https://eu-nbg-2-connect.betterstackdata.com";

/// Environment variable holding the sources API bearer token.
pub const API_TOKEN_VAR: &str = "LOQ_API_TOKEN";

/// Environment variable holding the query endpoint username.
pub const QUERY_USERNAME_VAR: &str = "LOQ_QUERY_USERNAME";

/// Environment variable holding the query endpoint password.
pub const QUERY_PASSWORD_VAR: &str = "LOQ_QUERY_PASSWORD";

/// Environment variable overriding the query endpoint URL.
pub const QUERY_URL_VAR: &str = "LOQ_QUERY_URL";

/// Most recent queries kept in the history list.
const HISTORY_LIMIT: usize = 100;

/// Short names for the sources used day to day.
const SOURCE_ALIASES: &[(&str, &str)] = &[
    ("dev", "sweetistics-dev"),
    ("development", "sweetistics-dev"),
    ("prod", "sweetistics"),
    ("production", "sweetistics"),
    ("staging", "sweetistics-staging"),
    ("test", "sweetistics-test"),
];

/// Errors from loading or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON of the expected shape.
    #[error("Malformed config file: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The home directory could not be determined.
    #[error("Could not determine the home directory")]
    NoHome,

    /// A required environment variable is missing.
    #[error("{0} environment variable is not set")]
    MissingEnv(&'static str),
}

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Source queried when none is given on the command line.
    pub default_source: Option<String>,
    /// Row cap applied when no `--limit` is given.
    pub default_limit: u64,
    /// Level filter applied when no `--level` is given; `all` disables it.
    pub default_log_level: String,
    /// Format used when no `--format` is given.
    pub output_format: OutputFormat,
    /// Query endpoint; `None` means [`DEFAULT_QUERY_BASE_URL`].
    pub query_base_url: Option<String>,
    /// Named queries saved for reuse.
    pub saved_queries: BTreeMap<String, String>,
    /// Recent query strings, most recent last.
    pub query_history: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_source: None,
            default_limit: DEFAULT_LIMIT,
            default_log_level: "all".to_string(),
            output_format: OutputFormat::Pretty,
            query_base_url: None,
            saved_queries: BTreeMap::new(),
            query_history: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the configuration; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when the home directory is unknown,
    /// [`ConfigError::Io`] when the file exists but cannot be read, and
    /// [`ConfigError::Malformed`] when it does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file()?)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the configuration, creating `~/.loq` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when the home directory is unknown
    /// and [`ConfigError::Io`] when the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file()?)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Appends a query to the history, dropping the oldest entries beyond
    /// the cap.
    pub fn push_history(&mut self, query: impl Into<String>) {
        self.query_history.push(query.into());
        if self.query_history.len() > HISTORY_LIMIT {
            let excess = self.query_history.len() - HISTORY_LIMIT;
            self.query_history.drain(..excess);
        }
    }

    /// The effective query endpoint: environment override, then the config
    /// file, then the built-in default.
    #[must_use]
    pub fn query_url(&self) -> String {
        std::env::var(QUERY_URL_VAR)
            .ok()
            .or_else(|| self.query_base_url.clone())
            .unwrap_or_else(|| DEFAULT_QUERY_BASE_URL.to_string())
    }
}

fn config_file() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    Ok(home.join(".loq").join("config.json"))
}

/// Bearer token for the sources API.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] when `LOQ_API_TOKEN` is not set.
pub fn api_token() -> Result<String, ConfigError> {
    std::env::var(API_TOKEN_VAR).map_err(|_| ConfigError::MissingEnv(API_TOKEN_VAR))
}

/// Basic credentials for the query endpoint, when both halves are set.
#[must_use]
pub fn query_credentials() -> Option<(String, String)> {
    let username = std::env::var(QUERY_USERNAME_VAR).ok()?;
    let password = std::env::var(QUERY_PASSWORD_VAR).ok()?;
    Some((username, password))
}

/// Maps a short alias to its canonical source name; unknown names pass
/// through unchanged. Aliases match case-insensitively.
#[must_use]
pub fn resolve_source_alias(name: &str) -> &str {
    let lowered = name.to_lowercase();
    SOURCE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or(name, |(_, canonical)| *canonical)
}

// ============================================================================
// Tests
// ============================================================================
