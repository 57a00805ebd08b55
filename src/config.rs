// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Cfgs persists a tiny JSON record under the live root that remembers where
//! the repository lives, and optionally which globs to ignore while scanning.
//! Parsing goes through [`FromStr`] and rendering through [`Display`], with
//! [`load`] and [`save`] handling the file I/O.

use crate::{
    files::write_file,
    matcher::{sanitize, IgnoreMatcher, MatcherError},
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Persisted cfgs configuration.
///
/// # General Layout
///
/// ```json
/// {
///   "repo_path": "/home/user/.cfgs",
///   "ignore_globs": ["node_modules", "**/node_modules/**"]
/// }
/// ```
///
/// The `ignore_globs` field is optional. When present and non-empty, it
/// replaces the default ignore set entirely.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CfgsConfig {
    /// Location of the configuration repository.
    pub repo_path: String,

    /// Globs skipped while scanning the live root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_globs: Vec<String>,
}

impl CfgsConfig {
    /// Construct new configuration for repository path.
    pub fn new(repo_path: impl Into<String>, ignore_globs: Vec<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            ignore_globs: sanitize(ignore_globs),
        }
    }

    /// Compile ignore matcher from configured globs.
    ///
    /// Falls back to the default ignore set when no globs are configured.
    ///
    /// # Errors
    ///
    /// - Return [`MatcherError`] if a configured glob cannot be compiled.
    pub fn ignore_matcher(&self) -> Result<IgnoreMatcher, MatcherError> {
        if self.ignore_globs.is_empty() {
            return Ok(IgnoreMatcher::default());
        }

        IgnoreMatcher::compile(&self.ignore_globs)
    }
}

impl FromStr for CfgsConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: CfgsConfig = serde_json::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Stored values are tidied before anyone sees them.
        config.repo_path = config.repo_path.trim().to_string();
        config.ignore_globs = sanitize(&config.ignore_globs);

        Ok(config)
    }
}

impl Display for CfgsConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut data = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        data.push('\n');
        fmt.write_str(data.as_str())
    }
}

/// Location of configuration file under live root.
pub fn config_path(live_root: impl AsRef<Path>) -> PathBuf {
    live_root.as_ref().join("cfgs").join("config.json")
}

/// Load configuration from path.
///
/// Returns nothing if the file does not exist, or if it names no repository.
///
/// # Errors
///
/// - Return [`ConfigError::Read`] if the file exists but cannot be read.
/// - Return [`ConfigError::Deserialize`] if the file is not valid JSON.
#[instrument(level = "debug")]
pub fn load(path: &Path) -> Result<Option<CfgsConfig>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!("no configuration file");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                source,
                path: path.to_path_buf(),
            })
        }
    };

    let config: CfgsConfig = data.parse()?;
    if config.repo_path.is_empty() {
        debug!("configuration names no repository");
        return Ok(None);
    }

    Ok(Some(config))
}

/// Save configuration to path, creating parent directories as needed.
///
/// # Errors
///
/// - Return [`ConfigError::Serialize`] if configuration cannot be rendered.
/// - Return [`ConfigError::Write`] if the file cannot be written.
#[instrument(skip(config), level = "debug")]
pub fn save(path: &Path, config: &CfgsConfig) -> Result<()> {
    let mut data = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    data.push('\n');
    write_file(path, data).map_err(|source| ConfigError::Write {
        source,
        path: path.to_path_buf(),
    })
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(serde_json::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(serde_json::Error),

    /// Failed to read configuration file.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write configuration file.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
