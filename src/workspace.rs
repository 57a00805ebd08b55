// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Resolved locations for a single command invocation.

use crate::{matcher::IgnoreMatcher, path::ManagedPath};

use std::path::{Path, PathBuf};

/// Live root, repository root, and ignore rules of one invocation.
///
/// Built once at startup, then handed by reference to every operation that
/// touches the file system. Nothing in cfgs reads these locations from
/// anywhere else.
#[derive(Debug, Clone)]
pub struct Workspace {
    live_root: PathBuf,
    repo_root: PathBuf,
    ignore: IgnoreMatcher,
}

impl Workspace {
    /// Construct new workspace.
    pub fn new(
        live_root: impl Into<PathBuf>,
        repo_root: impl Into<PathBuf>,
        ignore: IgnoreMatcher,
    ) -> Self {
        Self {
            live_root: live_root.into(),
            repo_root: repo_root.into(),
            ignore,
        }
    }

    /// Directory holding the user's live configuration files.
    pub fn live_root(&self) -> &Path {
        self.live_root.as_path()
    }

    /// Top-level directory of the repository work tree.
    pub fn repo_root(&self) -> &Path {
        self.repo_root.as_path()
    }

    /// Ignore rules applied to live root scans.
    pub fn ignore(&self) -> &IgnoreMatcher {
        &self.ignore
    }

    /// Absolute path of live entry for managed path.
    pub fn live_path(&self, rel: &ManagedPath) -> PathBuf {
        rel.under(&self.live_root)
    }

    /// Absolute path of repository file for managed path.
    pub fn repo_path(&self, rel: &ManagedPath) -> PathBuf {
        rel.under(&self.repo_root)
    }
}
