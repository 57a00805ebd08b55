// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository location.
//!
//! Figure out which repository an invocation operates on. The `CFGS_REPO`
//! environment variable wins over the persisted configuration, and a
//! candidate is only accepted once it proves to be a git repository with at
//! least one remote.

use crate::{
    config::CfgsConfig,
    path::expand,
    vcs::{Vcs, VcsError},
};

use std::{fs, path::PathBuf};
use tracing::{debug, instrument};

/// Environment variable overriding the configured repository.
pub const REPO_ENV: &str = "CFGS_REPO";

/// Validate candidate repository path.
///
/// Expands a leading `~`, then returns the repository's top-level directory.
///
/// # Errors
///
/// - Return [`RepoError::NotFound`] if nothing exists at path.
/// - Return [`RepoError::NotDirectory`] if path is not a directory.
/// - Return [`RepoError::NotGitRepo`] if path is not inside a git repository.
/// - Return [`RepoError::NoRemote`] if repository has no remote configured.
#[instrument(skip(vcs), level = "debug")]
pub fn validate(path: &str, vcs: &dyn Vcs) -> Result<PathBuf> {
    let path = expand(path);
    let metadata = fs::metadata(&path).map_err(|source| RepoError::NotFound {
        source,
        path: path.clone(),
    })?;
    if !metadata.is_dir() {
        return Err(RepoError::NotDirectory { path });
    }

    let root = vcs
        .repo_root(&path)
        .map_err(|source| RepoError::NotGitRepo {
            source,
            path: path.clone(),
        })?;

    if vcs.remotes(&root)?.is_empty() {
        return Err(RepoError::NoRemote { path: root });
    }

    debug!("using repository {}", root.display());
    Ok(root)
}

/// Resolve repository for this invocation.
///
/// Environment override first, then persisted configuration.
///
/// # Errors
///
/// - Return [`RepoError::Env`] if the environment override is invalid.
/// - Return [`RepoError::Config`] if the configured path is invalid.
/// - Return [`RepoError::Unresolved`] if neither source names a repository.
pub fn resolve(
    env_override: Option<&str>,
    config: Option<&CfgsConfig>,
    vcs: &dyn Vcs,
) -> Result<PathBuf> {
    if let Some(path) = env_override.map(str::trim).filter(|path| !path.is_empty()) {
        return validate(path, vcs).map_err(|error| RepoError::Env(Box::new(error)));
    }

    if let Some(config) = config.filter(|config| !config.repo_path.trim().is_empty()) {
        return validate(&config.repo_path, vcs)
            .map_err(|error| RepoError::Config(Box::new(error)));
    }

    Err(RepoError::Unresolved)
}

/// Repository resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Nothing exists at candidate path.
    #[error("repository path {:?} does not exist", path.display())]
    NotFound {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Candidate path is not a directory.
    #[error("repository path {:?} is not a directory", path.display())]
    NotDirectory { path: PathBuf },

    /// Candidate path is not a git repository.
    #[error("repository path {:?} is not a git repository", path.display())]
    NotGitRepo {
        #[source]
        source: VcsError,
        path: PathBuf,
    },

    /// Repository has no remote to sync with.
    #[error("repository {:?} has no git remote configured", path.display())]
    NoRemote { path: PathBuf },

    /// Version control failed while inspecting repository.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Environment override names an invalid repository.
    #[error("CFGS_REPO")]
    Env(#[source] Box<RepoError>),

    /// Persisted configuration names an invalid repository.
    #[error("cfgs config repo_path")]
    Config(#[source] Box<RepoError>),

    /// No repository configured anywhere.
    #[error(
        "could not resolve repository (run `cfgs init`, set CFGS_REPO, or create \
         $XDG_CONFIG_HOME/cfgs/config.json)"
    )]
    Unresolved,
}

/// Friendly result alias :3
type Result<T, E = RepoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::testing::FakeVcs;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn validate_accepts_repo_with_remote() -> anyhow::Result<()> {
        let dir = std::env::current_dir()?.join("repo");
        fs::create_dir_all(&dir)?;
        let vcs = FakeVcs::tracking(Vec::<String>::new());

        assert_eq!(validate(&dir.to_string_lossy(), &vcs)?, dir);

        Ok(())
    }

    #[sealed_test]
    fn validate_rejects_bad_candidates() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        fs::write(root.join("file"), "x")?;
        fs::create_dir_all(root.join("repo"))?;
        let vcs = FakeVcs::tracking(Vec::<String>::new());

        let missing = root.join("missing");
        assert!(matches!(
            validate(&missing.to_string_lossy(), &vcs),
            Err(RepoError::NotFound { .. })
        ));
        assert!(matches!(
            validate(&root.join("file").to_string_lossy(), &vcs),
            Err(RepoError::NotDirectory { .. })
        ));

        let not_a_repo = FakeVcs {
            not_a_repo: true,
            ..vcs.clone()
        };
        assert!(matches!(
            validate(&root.join("repo").to_string_lossy(), &not_a_repo),
            Err(RepoError::NotGitRepo { .. })
        ));

        let no_remote = FakeVcs {
            remotes: Vec::new(),
            ..vcs
        };
        assert!(matches!(
            validate(&root.join("repo").to_string_lossy(), &no_remote),
            Err(RepoError::NoRemote { .. })
        ));

        Ok(())
    }

    #[sealed_test]
    fn resolve_prefers_env_override() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        fs::create_dir_all(root.join("env"))?;
        fs::create_dir_all(root.join("config"))?;
        let vcs = FakeVcs::tracking(Vec::<String>::new());
        let config = CfgsConfig::new(root.join("config").to_string_lossy(), Vec::new());
        let env = root.join("env").to_string_lossy().into_owned();

        assert_eq!(resolve(Some(&env), Some(&config), &vcs)?, root.join("env"));
        assert_eq!(resolve(Some("  "), Some(&config), &vcs)?, root.join("config"));

        Ok(())
    }

    #[sealed_test]
    fn resolve_prefixes_source_of_error() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let vcs = FakeVcs::tracking(Vec::<String>::new());
        let missing = root.join("missing").to_string_lossy().into_owned();
        let config = CfgsConfig::new(missing.clone(), Vec::new());

        let error = anyhow::Error::from(resolve(Some(&missing), None, &vcs).unwrap_err());
        assert!(format!("{error:#}").starts_with("CFGS_REPO: repository path"));

        let error = anyhow::Error::from(resolve(None, Some(&config), &vcs).unwrap_err());
        assert!(format!("{error:#}").starts_with("cfgs config repo_path: repository path"));

        Ok(())
    }

    #[test]
    fn resolve_without_any_source() {
        let vcs = FakeVcs::default();
        assert!(matches!(resolve(None, None, &vcs), Err(RepoError::Unresolved)));
    }
}
