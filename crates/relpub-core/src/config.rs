//! Configuration loading.
//!
//! Values come from, in increasing priority: built-in defaults, a TOML file
//! (`relpub.toml` in the working directory or an explicit path), environment
//! variables, and finally CLI flags applied by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::daemon::{DEFAULT_READY_LINE, DaemonSpec};
use crate::endpoint::{Endpoint, EndpointError};
use crate::release::{DEFAULT_API_BASE, DEFAULT_ROUTE_BASE};

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "relpub.toml";

/// Comma-separated endpoint list override.
pub const ENDPOINTS_ENV: &str = "RELPUB_ENDPOINTS";
/// `owner/name` override for the release repository.
pub const REPOSITORY_ENV: &str = "RELPUB_REPOSITORY";
/// Token for the releases API.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An endpoint address is malformed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[publish]` table.
    pub publish: PublishSection,
    /// `[daemon]` table.
    pub daemon: DaemonSection,
    /// `[release]` table.
    pub release: ReleaseSection,
}

/// Settings for `publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
    /// Endpoint addresses in priority order.
    pub endpoints: Vec<String>,
    /// Bound on a whole publish call in seconds, 0 for none.
    pub timeout_secs: u64,
    /// CI output key for the selected identifier.
    pub output_key: String,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "http://127.0.0.1:5001".to_string(),
                "https://ipfs.infura.io:5001".to_string(),
                "https://ipfs.oceanprotocol.com/ipfs/".to_string(),
            ],
            timeout_secs: 600,
            output_key: relpub_schema::DEFAULT_OUTPUT_KEY.to_string(),
        }
    }
}

/// Settings for `daemon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSection {
    /// Program to run.
    pub program: String,
    /// Its arguments.
    pub args: Vec<String>,
    /// Readiness line.
    pub ready_line: String,
    /// Readiness bound in seconds, 0 for none.
    pub timeout_secs: u64,
    /// Log receiving the daemon's output; a fresh temp file when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            program: "ipfs".to_string(),
            args: vec!["daemon".to_string()],
            ready_line: DEFAULT_READY_LINE.to_string(),
            timeout_secs: 120,
            log_file: None,
        }
    }
}

/// Settings for `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSection {
    /// REST API base URL.
    pub api_base: String,
    /// Repository as `owner/name`.
    pub repository: String,
    /// Route prefix for canonical redirects.
    pub route_base: String,
    /// API token; only ever taken from the environment.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ReleaseSection {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            repository: "nao20010128nao/ytdl-patched".to_string(),
            route_base: DEFAULT_ROUTE_BASE.to_string(),
            token: None,
        }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl Config {
    /// Load from `path`, or from `relpub.toml` in the working directory if it
    /// exists, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` cannot be read or any file
    /// fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE_NAME).is_file() => {
                Self::from_file(Path::new(CONFIG_FILE_NAME))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&text)
    }

    /// Parse TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup(ENDPOINTS_ENV).filter(|v| !v.trim().is_empty()) {
            self.publish.endpoints = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(repo) = lookup(REPOSITORY_ENV).filter(|v| !v.is_empty()) {
            self.release.repository = repo;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.release.token = Some(token);
        }
    }

    /// Parsed endpoint list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Endpoint`] for the first malformed address.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        Ok(self
            .publish
            .endpoints
            .iter()
            .map(|e| Endpoint::parse(e))
            .collect::<Result<_, _>>()?)
    }

    /// Bound on a publish call.
    pub fn publish_timeout(&self) -> Option<Duration> {
        secs(self.publish.timeout_secs)
    }

    /// Daemon launch description.
    pub fn daemon_spec(&self) -> DaemonSpec {
        DaemonSpec {
            program: self.daemon.program.clone(),
            args: self.daemon.args.clone(),
            ready_line: self.daemon.ready_line.clone(),
            timeout: secs(self.daemon.timeout_secs),
            log_file: self.daemon.log_file.clone(),
        }
    }
}
