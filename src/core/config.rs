//! Process-wide configuration, loaded once at startup and injected into the Dispatcher.
//!
//! Sources, lowest to highest priority: built-in defaults, `tidepool.toml`, `.env`
//! (via `dotenvy`), process environment. Handlers never read the environment.

use crate::core::external_action::{self, ExternalActionRule};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "tidepool.toml";

pub const ENV_DATA_DIR: &str = "TIDEPOOL_DATA_DIR";
pub const ENV_LOG: &str = "TIDEPOOL_LOG";
pub const ENV_TOKEN: &str = "AIPROXY_TOKEN";
pub const ENV_API_BASE: &str = "OPENAI_API_BASE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Date parsing policy for the weekday counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateParsing {
    /// ISO dates and ISO date-times only.
    Strict,
    /// ISO plus the common `YYYY/MM/DD`, `DD-Mon-YYYY` and `Mon DD, YYYY` spellings.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Working directory for project-level scripts (datagen, prettier).
    pub project_dir: PathBuf,
    /// Sandbox root. Defaults to `<project_dir>/<mount>`.
    pub data_dir: Option<PathBuf>,
    /// Segment accepted as `/data/...` and `./data/...`.
    pub mount: String,
    pub log_level: String,
    pub date_parsing: DateParsing,
    pub remote: RemoteConfig,
    pub tools: ToolsConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            data_dir: None,
            mount: "data".to_string(),
            log_level: "warn".to_string(),
            date_parsing: DateParsing::default(),
            remote: RemoteConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    /// Per-request timeout; every network call carries it. No retries.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://aiproxy.sanand.workers.dev/openai/v1".to_string(),
            token: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub python: String,
    pub npx: String,
    /// Package spec handed to `npx`.
    pub prettier: String,
    pub git: String,
    /// Wall-clock limit for one subprocess; the child is killed at the deadline.
    pub timeout_secs: u64,
    /// Binaries each external capability may launch.
    pub rules: Vec<ExternalActionRule>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            npx: "npx".to_string(),
            prettier: "prettier@3.4.2".to_string(),
            git: "git".to_string(),
            timeout_secs: 300,
            rules: external_action::default_rules(),
        }
    }
}

impl AgentConfig {
    /// Load from an explicit file, or `./tidepool.toml` when present, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let candidate = PathBuf::from(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment values using an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.remote.token = Some(token);
        }
        if let Some(base) = lookup(ENV_API_BASE).filter(|v| !v.trim().is_empty()) {
            self.remote.api_base = base;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "remote.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "tools.timeout_secs must be at least 1".to_string(),
            ));
        }
        let mount = self.mount.trim_matches('/');
        if mount.is_empty() || mount.contains('/') || mount == "." || mount == ".." {
            return Err(ConfigError::Invalid(format!(
                "mount '{}' must be a single path segment",
                self.mount
            )));
        }
        if self.remote.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("remote.api_base is empty".to_string()));
        }
        Ok(())
    }

    /// Absolute sandbox root.
    pub fn data_root(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => self.project_dir.join(&self.mount),
        };
        std::path::absolute(&dir).map_err(|source| ConfigError::Io {
            path: dir.display().to_string(),
            source,
        })
    }

    pub fn project_root(&self) -> Result<PathBuf, ConfigError> {
        std::path::absolute(&self.project_dir).map_err(|source| ConfigError::Io {
            path: self.project_dir.display().to_string(),
            source,
        })
    }

    /// Config pointing at an explicit sandbox root, everything else default.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }
}
