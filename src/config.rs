use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Google Books rejects `maxResults` above 40.
pub const MAX_RESULTS_CEILING: usize = 40;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "Bookledger/0.1";

/// Runtime settings. Defaults, then an optional TOML file, then `BOOKLEDGER_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub google_books_url: String,
    pub open_library_books_url: String,
    pub open_library_search_url: String,
    pub open_library_covers_url: String,
    pub max_results: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_books_url: "https://www.googleapis.com/books/v1/volumes".to_string(),
            open_library_books_url: "https://openlibrary.org/api/books".to_string(),
            open_library_search_url: "https://openlibrary.org/search.json".to_string(),
            open_library_covers_url: "https://covers.openlibrary.org/b/id".to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            database_path: PathBuf::from("bookledger.db"),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        config.max_results = clamp_max_results(config.max_results);
        config.http_timeout_secs = clamp_timeout_secs(config.http_timeout_secs);
        Ok(config)
    }

    /// Override fields from variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("BOOKLEDGER_GOOGLE_BOOKS_URL") {
            self.google_books_url = value;
        }
        if let Some(value) = get("BOOKLEDGER_OPEN_LIBRARY_BOOKS_URL") {
            self.open_library_books_url = value;
        }
        if let Some(value) = get("BOOKLEDGER_OPEN_LIBRARY_SEARCH_URL") {
            self.open_library_search_url = value;
        }
        if let Some(value) = get("BOOKLEDGER_OPEN_LIBRARY_COVERS_URL") {
            self.open_library_covers_url = value;
        }
        if let Some(value) = get("BOOKLEDGER_MAX_RESULTS") {
            self.max_results = parse_env("BOOKLEDGER_MAX_RESULTS", &value)?;
        }
        if let Some(value) = get("BOOKLEDGER_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("BOOKLEDGER_HTTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("BOOKLEDGER_DB") {
            self.database_path = PathBuf::from(value);
        }
        self.max_results = clamp_max_results(self.max_results);
        self.http_timeout_secs = clamp_timeout_secs(self.http_timeout_secs);
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn clamp_max_results(value: usize) -> usize {
    value.clamp(1, MAX_RESULTS_CEILING)
}

/// A zero timeout would fail every request before it is sent.
pub(crate) fn clamp_timeout_secs(value: u64) -> u64 {
    value.max(1)
}
