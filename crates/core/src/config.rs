// SPDX-License-Identifier: MIT

//! Process-wide configuration.
//!
//! The `Config` struct is constructed once at process start and passed by
//! reference to every component. There is no lazily-initialized global.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "SLUICE_CONFIG";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("runner `{runner}` is a grid runner and requires engine.partition")]
    MissingPartition { runner: String },
}

/// Identity used for commits the system creates itself.
///
/// A commit whose author and message both match this identity is an
/// autocommit, and must never re-trigger a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitIdentity {
    pub author: String,
    pub email: String,
    pub message: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            author: "repomaster".to_string(),
            email: "repomaster@localhost".to_string(),
            message: "postrun-autocommit".to_string(),
        }
    }
}

/// Location of the out-of-band large-object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Local directory holding large-object content.
    pub path: PathBuf,
    /// Transport host written into the store sync file.
    pub host: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        let home = std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
        Self { path: home.join("sluice-store"), host: "localhost".to_string() }
    }
}

/// Large-object routing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesSection {
    /// Filter name written into attributes lines (and the `git <filter>` subcommand).
    pub filter: String,
    /// Files larger than this are routed through the large-object store.
    pub threshold_bytes: u64,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self { filter: "fat".to_string(), threshold_bytes: 1024 * 1024 }
    }
}

/// External pipeline engine invocation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Engine binary name or path.
    pub command: String,
    pub runner: String,
    pub jobs: u32,
    /// Grid partition; required when `runner` is listed in `grid_runners`.
    pub partition: String,
    /// Runners that take a `--partition` argument.
    pub grid_runners: Vec<String>,
    /// Engine output directory (relative to the work tree) scanned for large files.
    pub products_dir: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            command: "pipeline".to_string(),
            runner: "local".to_string(),
            jobs: 1,
            partition: String::new(),
            grid_runners: vec!["slurm".to_string(), "sge".to_string()],
            products_dir: "products".to_string(),
        }
    }
}

/// Where users can watch run progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSection {
    /// Status URL template; `{project}` is substituted with the project name.
    pub url: String,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self { url: "http://localhost:8082/api/{project}".to_string() }
    }
}

/// Full sluice configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub commit: CommitIdentity,
    pub store: StoreSection,
    pub routes: RoutesSection,
    pub engine: EngineSection,
    pub reporter: ReporterSection,
}

impl Config {
    /// Load configuration from the discovery chain.
    ///
    /// Order: `$SLUICE_CONFIG` (an unreadable or invalid file here is an
    /// error), then `./sluice.toml`, then the XDG config directory, then
    /// `/etc/sluice/config.toml`. Falls back to built-in defaults when no
    /// file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_path(Path::new(&explicit));
        }
        for candidate in Self::default_locations() {
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
        }
        tracing::warn!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self = toml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Search locations checked when `$SLUICE_CONFIG` is not set.
    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from("./sluice.toml")];
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            locations.push(PathBuf::from(xdg).join("sluice/config.toml"));
        } else if let Ok(home) = std::env::var("HOME") {
            locations.push(PathBuf::from(home).join(".config/sluice/config.toml"));
        }
        locations.push(PathBuf::from("/etc/sluice/config.toml"));
        locations
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.grid_runners.contains(&self.engine.runner)
            && self.engine.partition.is_empty()
        {
            return Err(ConfigError::MissingPartition { runner: self.engine.runner.clone() });
        }
        Ok(())
    }

    /// Status URL for a project, with the `{project}` placeholder substituted.
    pub fn reporter_url(&self, project: &str) -> String {
        self.reporter.url.replace("{project}", project)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
