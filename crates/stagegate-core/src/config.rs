//! Project configuration file support for stagegate.
//!
//! Loads configuration from `stagegate.toml` at the repository root.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "stagegate.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid [tasks.{section}] configuration: {message}")]
    InvalidSection { section: String, message: String },

    #[error("Unknown task section [tasks.{section}], expected one of: {known}")]
    UnknownSection { section: String, known: String },
}

/// Parameters of a single hook run, supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct HooksConfig {
    /// Keep scanning after a rejection instead of aborting
    pub continue_on_rejected: bool,
    /// Explicit configuration file; defaults to `<git root>/stagegate.toml`
    pub config_path: Option<PathBuf>,
}

impl HooksConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continue_on_rejected(mut self, continue_on_rejected: bool) -> Self {
        self.continue_on_rejected = continue_on_rejected;
        self
    }

    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }
}

/// Project-level configuration loaded from `stagegate.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Set to `false` to turn every check off
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Regexes matched against paths relative to the scanned directory
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Per-task sections, deserialized by the tasks themselves
    #[serde(default)]
    pub tasks: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude: Vec::new(),
            tasks: toml::Table::new(),
        }
    }
}

impl std::str::FromStr for ProjectConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl ProjectConfig {
    /// Load configuration from `path`.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        Self::load_file(path).map(Some)
    }

    /// Load configuration from `path`, failing if it does not exist.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compile the exclude patterns so each one must match the whole path.
    pub fn exclude_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.exclude
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
                    ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Fail on the first `[tasks.<name>]` section whose name is not in `known`.
    pub fn check_task_sections(&self, known: &[&str]) -> Result<(), ConfigError> {
        match self.tasks.keys().find(|name| !known.contains(&name.as_str())) {
            Some(section) => Err(ConfigError::UnknownSection {
                section: section.clone(),
                known: known.join(", "),
            }),
            None => Ok(()),
        }
    }

    /// Deserialize the `[tasks.<name>]` section, or its default if absent.
    pub fn task_section<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.tasks.get(name) {
            None => Ok(T::default()),
            Some(value) => {
                value
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| ConfigError::InvalidSection {
                        section: name.to_string(),
                        message: e.to_string(),
                    })
            }
        }
    }
}
