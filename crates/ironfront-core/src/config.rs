//! Simulation configuration, loaded from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::WorldSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// What a tech tree does when an item registers under a key that is already watched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace the existing watcher (last write wins) and log a warning.
    #[default]
    Overwrite,
    /// Keep the existing watcher and return an error.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Lobby tech level; tech-level providers only switch on when their level matches.
    pub tech_level: Option<String>,

    /// Handling of duplicate watcher registration.
    pub duplicate_registration: DuplicatePolicy,

    /// `tracing_subscriber::EnvFilter` directive used by the CLI.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tech_level: None,
            duplicate_registration: DuplicatePolicy::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl SimConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            tech_level: self.tech_level.clone(),
            duplicate_policy: self.duplicate_registration,
        }
    }
}
