//! Process configuration read from TOML files and `MONGO_SEARCH_*` variables.
//!
//! Precedence: CLI > env > config files > defaults. Among config files the
//! first one that sets a key wins, searched in this order: `--config`,
//! `$MONGO_SEARCH_CONFIG`, `~/.config/mongo_search.toml`, `./mongo_search.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::DbError;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// A bearer token and the caller it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub token: String,
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind: Option<String>,
    /// JSON file holding persisted settings; in-memory when unset.
    pub settings_path: Option<PathBuf>,
    /// Directory of `<kind>.ndjson` files loaded at startup.
    pub seed_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    /// log4rs YAML file; takes over from `log_dir`/`log_level` when set.
    pub log_config: Option<PathBuf>,
    pub query_timeout_ms: Option<u64>,
    #[serde(default)]
    pub principals: Vec<Principal>,
}

impl AppConfig {
    /// Parses one TOML document.
    ///
    /// # Errors
    /// Returns `DbError::Settings` when the text is not valid config TOML.
    pub fn from_toml(text: &str) -> Result<Self, DbError> {
        toml::from_str(text).map_err(|e| DbError::Settings(e.to_string()))
    }

    /// Fills every unset key from `other`.
    pub fn merge_missing(&mut self, other: Self) {
        if self.bind.is_none() {
            self.bind = other.bind;
        }
        if self.settings_path.is_none() {
            self.settings_path = other.settings_path;
        }
        if self.seed_dir.is_none() {
            self.seed_dir = other.seed_dir;
        }
        if self.log_dir.is_none() {
            self.log_dir = other.log_dir;
        }
        if self.log_level.is_none() {
            self.log_level = other.log_level;
        }
        if self.log_config.is_none() {
            self.log_config = other.log_config;
        }
        if self.query_timeout_ms.is_none() {
            self.query_timeout_ms = other.query_timeout_ms;
        }
        if self.principals.is_empty() {
            self.principals = other.principals;
        }
    }

    /// Overrides keys from `MONGO_SEARCH_*` variables read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(s) = var("MONGO_SEARCH_BIND") {
            self.bind = Some(s);
        }
        if let Some(s) = var("MONGO_SEARCH_SETTINGS") {
            self.settings_path = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MONGO_SEARCH_SEED_DIR") {
            self.seed_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MONGO_SEARCH_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MONGO_SEARCH_LOG_LEVEL") {
            self.log_level = Some(s);
        }
        if let Some(s) = var("MONGO_SEARCH_LOG_CONFIG") {
            self.log_config = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MONGO_SEARCH_QUERY_TIMEOUT_MS") {
            match s.parse() {
                Ok(ms) => self.query_timeout_ms = Some(ms),
                Err(_) => log::warn!("ignoring MONGO_SEARCH_QUERY_TIMEOUT_MS={s}: not a number"),
            }
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }
}

/// Candidate config files in precedence order.
#[must_use]
pub fn config_paths(cli_cfg: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = cli_cfg {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("MONGO_SEARCH_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(home) = dirs_next::home_dir() {
        paths.push(home.join(".config").join("mongo_search.toml"));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("mongo_search.toml"));
    }
    paths
}

/// Merges `paths` in order; missing files are skipped.
///
/// # Errors
/// Returns an error for a file that exists but cannot be read or parsed.
pub fn load_files(paths: &[PathBuf]) -> Result<AppConfig, DbError> {
    let mut cfg = AppConfig::default();
    for p in paths.iter().filter(|p| p.exists()) {
        let text = std::fs::read_to_string(p)?;
        let file_cfg = AppConfig::from_toml(&text)
            .map_err(|e| DbError::Settings(format!("{}: {e}", p.display())))?;
        log::debug!("loaded config from {}", p.display());
        cfg.merge_missing(file_cfg);
    }
    Ok(cfg)
}

/// Files, then the process environment. CLI overrides are applied by the caller.
///
/// # Errors
/// See [`load_files`].
pub fn load_config(cli_cfg: Option<&Path>) -> Result<AppConfig, DbError> {
    let mut cfg = load_files(&config_paths(cli_cfg))?;
    cfg.apply_env(|k| std::env::var(k).ok());
    Ok(cfg)
}
