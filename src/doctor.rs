// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Reconciliation engine.
//!
//! The doctor converges the live root toward the repository. Each managed
//! path is inspected on both sides, classified through [`classify`], and the
//! resulting action is applied. Then every symlink in the live root that
//! points into the repository but is no longer managed gets cleaned up.
//!
//! # Safety Rules
//!
//! The doctor only ever replaces a live entry when nothing can be lost by
//! doing so: when the entry is missing, or when it is a regular file whose
//! bytes match the repository copy. Anything ambiguous ends up in
//! [`Bucket::RequireManualResolve`] untouched.

use crate::{
    files::{
        entry_kind, files_equal, is_regular_file, replace_with_copy, replace_with_symlink,
        repo_link_target, resolves_into, symlink_points_to, EntryKind,
    },
    managed::ManagedSet,
    path::{clean, ManagedPath},
    report::{Bucket, DoctorReport},
    scan::{symlinks, LiveLink, ScanError},
    workspace::Workspace,
};

use std::{fs, io::ErrorKind, path::Path};
use tracing::{debug, info, instrument, warn};

/// State of repository file for managed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoFile {
    /// Regular file, following symlinks.
    Regular,

    /// Missing, unreadable, or not a regular file.
    Unusable,
}

/// State of live entry for managed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEntry {
    /// Nothing exists at live path.
    Absent,

    /// Symlink resolving to the repository file.
    LinkedToRepo,

    /// Symlink resolving somewhere else.
    LinkedElsewhere,

    /// Regular file with the same bytes as the repository file.
    Identical,

    /// Regular file whose bytes differ from the repository file.
    Diverged,

    /// Directory or other special entry.
    Other,

    /// Entry could not be inspected.
    Unreadable,

    /// Parent directory links into the repository, so the live path names a
    /// repository entry.
    InsideRepo,
}

/// What to do with live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave live entry as is.
    Leave,

    /// Create symlink where nothing exists.
    Link,

    /// Swap identical copy for symlink.
    Relink,
}

/// Decide action and outcome bucket for managed path.
pub fn classify(repo: RepoFile, live: LiveEntry) -> (Action, Bucket) {
    match (repo, live) {
        (RepoFile::Unusable, _) => (Action::Leave, Bucket::RequireManualResolve),
        (RepoFile::Regular, LiveEntry::Absent) => (Action::Link, Bucket::ReplacedWithSymlink),
        (RepoFile::Regular, LiveEntry::LinkedToRepo) => (Action::Leave, Bucket::DidNotTouch),
        (RepoFile::Regular, LiveEntry::Identical) => (Action::Relink, Bucket::ReplacedWithSymlink),
        (
            RepoFile::Regular,
            LiveEntry::LinkedElsewhere
            | LiveEntry::Diverged
            | LiveEntry::Other
            | LiveEntry::Unreadable
            | LiveEntry::InsideRepo,
        ) => (Action::Leave, Bucket::RequireManualResolve),
    }
}

/// Reconciliation pass over one workspace.
#[derive(Debug)]
pub struct Doctor<'ws> {
    workspace: &'ws Workspace,
}

impl<'ws> Doctor<'ws> {
    /// Construct new doctor for workspace.
    pub fn new(workspace: &'ws Workspace) -> Self {
        Self { workspace }
    }

    /// Reconcile every managed path, then clean up orphan symlinks.
    ///
    /// Per-path failures never abort the pass, they land in
    /// [`Bucket::RequireManualResolve`] instead.
    ///
    /// # Errors
    ///
    /// - Return [`DoctorError::Scan`] if the live root cannot be walked for
    ///   orphan symlinks.
    #[instrument(skip(self, managed), level = "debug")]
    pub fn run(&self, managed: &ManagedSet) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();
        for rel in managed {
            let (action, bucket) = self.reconcile(rel);
            debug!("{rel}: {action:?} -> {bucket:?}");
            report.push(bucket, rel.as_str());
        }

        report.append(self.reconcile_orphans(managed)?);
        info!(
            "doctor finished with {} path(s) needing manual reconcile",
            report.require_manual_resolve.len()
        );

        Ok(report)
    }

    fn reconcile(&self, rel: &ManagedPath) -> (Action, Bucket) {
        let repo_file = self.workspace.repo_path(rel);
        let live = self.workspace.live_path(rel);

        let repo_state = if is_regular_file(&repo_file) {
            RepoFile::Regular
        } else {
            RepoFile::Unusable
        };
        let live_state = inspect_live(&live, &repo_file, self.workspace.repo_root());
        let (action, bucket) = classify(repo_state, live_state);

        let applied = match action {
            Action::Leave => Ok(()),
            Action::Link | Action::Relink => replace_with_symlink(&repo_file, &live),
        };

        match applied {
            Ok(()) => (action, bucket),
            Err(error) => {
                warn!("{rel}: failed to apply {action:?}: {error}");
                (Action::Leave, Bucket::RequireManualResolve)
            }
        }
    }

    fn reconcile_orphans(&self, managed: &ManagedSet) -> Result<DoctorReport> {
        let repo_root = clean(self.workspace.repo_root());
        let mut report = DoctorReport::default();

        for link in symlinks(self.workspace.live_root(), self.workspace.ignore())? {
            if managed.contains(&link.rel) {
                continue;
            }

            let target = match repo_link_target(&link.path, &repo_root) {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(error) => {
                    debug!("{}: cannot read link: {error}", link.rel);
                    continue;
                }
            };

            let (bucket, entry) = resolve_orphan(&link, &target);
            report.push(bucket, entry);
        }

        report.unlinked_orphan_symlink.sort();
        report.require_manual_resolve.sort();

        Ok(report)
    }
}

fn inspect_live(live: &Path, repo_file: &Path, repo_root: &Path) -> LiveEntry {
    if resolves_into(live, repo_root) {
        return LiveEntry::InsideRepo;
    }

    match entry_kind(live) {
        Ok(EntryKind::Absent) => LiveEntry::Absent,
        Ok(EntryKind::Symlink) => match symlink_points_to(live, repo_file) {
            Ok(true) => LiveEntry::LinkedToRepo,
            Ok(false) => LiveEntry::LinkedElsewhere,
            Err(_) => LiveEntry::Unreadable,
        },
        Ok(EntryKind::File) => match files_equal(repo_file, live) {
            Ok(true) => LiveEntry::Identical,
            Ok(false) => LiveEntry::Diverged,
            Err(_) => LiveEntry::Unreadable,
        },
        Ok(EntryKind::Other) => LiveEntry::Other,
        Err(_) => LiveEntry::Unreadable,
    }
}

fn resolve_orphan(link: &LiveLink, target: &Path) -> (Bucket, String) {
    let rel = link.rel.to_string();
    match fs::metadata(target) {
        Err(error) if error.kind() == ErrorKind::NotFound => match fs::remove_file(&link.path) {
            Ok(()) => (
                Bucket::UnlinkedOrphanSymlink,
                format!("{rel} (removed dangling symlink)"),
            ),
            Err(error) => {
                warn!("{rel}: cannot remove dangling symlink: {error}");
                (Bucket::RequireManualResolve, rel)
            }
        },
        Ok(metadata) if metadata.is_file() => match replace_with_copy(target, &link.path) {
            Ok(()) => (Bucket::UnlinkedOrphanSymlink, rel),
            Err(error) => {
                warn!("{rel}: cannot materialize orphan symlink: {error}");
                (Bucket::RequireManualResolve, rel)
            }
        },
        Ok(_) | Err(_) => (Bucket::RequireManualResolve, rel),
    }
}

/// Reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    /// Live root could not be walked.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Friendly result alias :3
type Result<T, E = DoctorError> = std::result::Result<T, E>;
