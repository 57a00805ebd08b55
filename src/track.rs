// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Track, untrack, and unlink operations.
//!
//! Each operation takes a batch of user selections and processes every path
//! on its own. A path that cannot be processed is recorded in the returned
//! [`OperationReport`] as skipped or failed, and the batch moves on. Nothing
//! is rolled back across paths.
//!
//! # Tracking
//!
//! Tracking moves the live file into the repository, then puts a symlink at
//! the live path pointing back at it. If the symlink cannot be created, the
//! file is moved back to where it came from.
//!
//! # Untracking
//!
//! Untracking makes sure an independent live copy exists before deleting the
//! repository file, so removing a file from the repository never costs the
//! user local access to its content.
//!
//! # Unlinking
//!
//! Unlinking swaps a live symlink for a plain copy of the repository file.
//! The repository and managed set stay as they are.

use crate::{
    files::{
        copy_file, ensure_parent, entry_kind, move_file, prune_empty_dirs, replace_with_copy,
        resolves_into, symlink, symlink_points_to, EntryKind,
    },
    managed::ManagedSet,
    path::{normalize, ManagedPath, PathError},
    report::OperationReport,
    workspace::Workspace,
};

use std::{fs, io, path::Path};
use tracing::{debug, instrument};

/// Move selected live files into repository and link them back.
///
/// Successfully tracked paths join the managed set.
#[instrument(skip(workspace, managed, selections), level = "debug")]
pub fn track(
    workspace: &Workspace,
    managed: &mut ManagedSet,
    selections: &[String],
    action: &str,
) -> OperationReport {
    track_linking_with(workspace, managed, selections, action, &|target, link| {
        symlink(target, link)
    })
}

// Same as track, with the symlink step supplied by the caller.
fn track_linking_with(
    workspace: &Workspace,
    managed: &mut ManagedSet,
    selections: &[String],
    action: &str,
    link: &dyn Fn(&Path, &Path) -> io::Result<()>,
) -> OperationReport {
    let mut report = OperationReport::new(action);
    for raw in selections {
        let outcome = normalize(raw)
            .map_err(|error| (None, ItemError::InvalidPath(error)))
            .and_then(|rel| track_one(workspace, managed, &rel, link).map(|_| rel));
        record(&mut report, raw, outcome, |rel| {
            managed.insert(rel);
        });
    }

    report
}

/// Remove selected files from repository, leaving independent live copies.
///
/// Successfully untracked paths leave the managed set.
#[instrument(skip(workspace, managed, selections), level = "debug")]
pub fn untrack(
    workspace: &Workspace,
    managed: &mut ManagedSet,
    selections: &[String],
) -> OperationReport {
    let mut report = OperationReport::new("remove");
    for raw in selections {
        let outcome = normalize(raw)
            .map_err(|error| (None, ItemError::InvalidPath(error)))
            .and_then(|rel| untrack_one(workspace, managed, &rel).map(|_| rel));
        record(&mut report, raw, outcome, |rel| {
            managed.remove(&rel);
        });
    }

    report
}

/// Replace live symlinks of selected managed files with plain copies.
#[instrument(skip(workspace, managed, selections), level = "debug")]
pub fn unlink(workspace: &Workspace, managed: &ManagedSet, selections: &[String]) -> OperationReport {
    let mut report = OperationReport::new("unlink");
    for raw in selections {
        let outcome = normalize(raw)
            .map_err(|error| (None, ItemError::InvalidPath(error)))
            .and_then(|rel| unlink_one(workspace, managed, &rel).map(|_| rel));
        record(&mut report, raw, outcome, |_| {});
    }

    report
}

fn record(
    report: &mut OperationReport,
    raw: &str,
    outcome: Result<ManagedPath, (Option<ManagedPath>, ItemError)>,
    mut on_success: impl FnMut(ManagedPath),
) {
    match outcome {
        Ok(rel) => {
            debug!("{rel}: done");
            report.succeed(rel.as_str());
            on_success(rel);
        }
        Err((rel, error)) => {
            // INVARIANT: Invalid selections are reported under their raw text.
            let entry = rel.map_or_else(|| raw.to_string(), |rel| rel.to_string());
            debug!("{entry}: {error}");
            if error.is_skip() {
                report.skip(entry, error);
            } else {
                report.fail(entry, error);
            }
        }
    }
}

type Outcome = Result<(), (Option<ManagedPath>, ItemError)>;

fn track_one(
    workspace: &Workspace,
    managed: &ManagedSet,
    rel: &ManagedPath,
    link: &dyn Fn(&Path, &Path) -> io::Result<()>,
) -> Outcome {
    let fail = |error: ItemError| (Some(rel.clone()), error);
    if managed.contains(rel) {
        return Err(fail(ItemError::AlreadyTracked));
    }

    let live = workspace.live_path(rel);
    let repo_file = workspace.repo_path(rel);

    match entry_kind(&live) {
        Ok(EntryKind::File) => {}
        Ok(EntryKind::Symlink | EntryKind::Other) => return Err(fail(ItemError::SourceNotRegular)),
        Ok(EntryKind::Absent) | Err(_) => return Err(fail(ItemError::SourceMissing)),
    }

    match entry_kind(&repo_file) {
        Ok(EntryKind::Absent) => {}
        Ok(_) => return Err(fail(ItemError::RepoFileExists)),
        Err(error) => return Err(fail(ItemError::RepoFileCheck(error))),
    }

    ensure_parent(&repo_file).map_err(|error| fail(ItemError::CreateRepoDir(error)))?;
    move_file(&live, &repo_file).map_err(|error| fail(ItemError::MoveFile(error)))?;

    let linked = ensure_parent(&live)
        .map_err(ItemError::CreateLiveDir)
        .and_then(|_| link(&repo_file, &live).map_err(ItemError::CreateSymlink));

    if let Err(cause) = linked {
        // INVARIANT: Never leave a repository-only file behind.
        return match move_file(&repo_file, &live) {
            Ok(()) => Err(fail(cause)),
            Err(rollback) => Err(fail(ItemError::Rollback {
                cause: Box::new(cause),
                rollback,
            })),
        };
    }

    Ok(())
}

fn untrack_one(workspace: &Workspace, managed: &ManagedSet, rel: &ManagedPath) -> Outcome {
    let fail = |error: ItemError| (Some(rel.clone()), error);
    if !managed.contains(rel) {
        return Err(fail(ItemError::NotTracked));
    }

    let live = workspace.live_path(rel);
    let repo_file = workspace.repo_path(rel);

    if fs::metadata(&repo_file).is_err() {
        return Err(fail(ItemError::RepoFileMissing));
    }

    // INVARIANT: Deleting the repository file must never delete the live one.
    if resolves_into(&live, workspace.repo_root()) {
        return Err(fail(ItemError::LiveInsideRepo));
    }

    match entry_kind(&live).map_err(|error| fail(ItemError::InspectLive(error)))? {
        EntryKind::Absent => {
            copy_file(&repo_file, &live).map_err(|error| fail(ItemError::CopyToLive(error)))?;
        }
        EntryKind::Symlink => {
            let linked = symlink_points_to(&live, &repo_file)
                .map_err(|error| fail(ItemError::InspectSymlink(error)))?;
            if !linked {
                return Err(fail(ItemError::LinkedElsewhere));
            }
            replace_with_copy(&repo_file, &live)
                .map_err(|error| fail(ItemError::CopyToLive(error)))?;
        }
        EntryKind::File => debug!("{rel}: live copy already independent"),
        EntryKind::Other => return Err(fail(ItemError::LiveNotRegular)),
    }

    fs::remove_file(&repo_file).map_err(|error| fail(ItemError::RemoveRepoFile(error)))?;
    if let Some(parent) = repo_file.parent() {
        prune_empty_dirs(workspace.repo_root(), parent);
    }

    Ok(())
}

fn unlink_one(workspace: &Workspace, managed: &ManagedSet, rel: &ManagedPath) -> Outcome {
    let fail = |error: ItemError| (Some(rel.clone()), error);
    if !managed.contains(rel) {
        return Err(fail(ItemError::NotTracked));
    }

    let live = workspace.live_path(rel);
    let repo_file = workspace.repo_path(rel);

    match entry_kind(&live) {
        Ok(EntryKind::Symlink) => {}
        Ok(EntryKind::Absent) | Err(_) => return Err(fail(ItemError::LiveMissing)),
        Ok(EntryKind::File | EntryKind::Other) => return Err(fail(ItemError::LiveNotSymlink)),
    }

    if !symlink_points_to(&live, &repo_file).unwrap_or(false) {
        return Err(fail(ItemError::NotLinkedToRepo));
    }

    replace_with_copy(&repo_file, &live).map_err(|error| fail(ItemError::Materialize(error)))
}

/// Reason a single selection was not processed.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("invalid path: {0}")]
    InvalidPath(PathError),

    #[error("already tracked")]
    AlreadyTracked,

    #[error("not tracked")]
    NotTracked,

    #[error("source file missing")]
    SourceMissing,

    #[error("source is not a regular file")]
    SourceNotRegular,

    #[error("repo file already exists")]
    RepoFileExists,

    #[error("repo file check failed: {0}")]
    RepoFileCheck(io::Error),

    #[error("create repo dir: {0}")]
    CreateRepoDir(io::Error),

    #[error("move file: {0}")]
    MoveFile(io::Error),

    #[error("create live dir: {0}")]
    CreateLiveDir(io::Error),

    #[error("create symlink: {0}")]
    CreateSymlink(io::Error),

    /// Compensating move back to the live path failed too.
    #[error("{cause}; rollback failed: {rollback}")]
    Rollback {
        cause: Box<ItemError>,
        rollback: io::Error,
    },

    #[error("repo file missing")]
    RepoFileMissing,

    #[error("inspect live file: {0}")]
    InspectLive(io::Error),

    #[error("inspect symlink: {0}")]
    InspectSymlink(io::Error),

    #[error("live symlink points elsewhere")]
    LinkedElsewhere,

    #[error("live path is not a regular file")]
    LiveNotRegular,

    #[error("live path reaches into repo through a linked directory")]
    LiveInsideRepo,

    #[error("copy repo file to live location: {0}")]
    CopyToLive(io::Error),

    #[error("remove repo file: {0}")]
    RemoveRepoFile(io::Error),

    #[error("live file missing")]
    LiveMissing,

    #[error("live file is not a symlink")]
    LiveNotSymlink,

    #[error("symlink does not point to repo file")]
    NotLinkedToRepo,

    #[error("replace symlink with copy: {0}")]
    Materialize(io::Error),
}

impl ItemError {
    /// Selection was left alone on purpose rather than failing.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::AlreadyTracked
                | Self::NotTracked
                | Self::SourceNotRegular
                | Self::LiveMissing
                | Self::LiveNotSymlink
                | Self::NotLinkedToRepo
        )
    }
}
