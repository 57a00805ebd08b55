// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system primitives.
//!
//! Small building blocks shared by the reconciliation engine and the track
//! operations. All of them work on absolute paths and report plain
//! [`std::io::Error`] values, leaving classification to the caller.
//!
//! Replacing a live entry, whether with a symlink or with a copy, goes through
//! a staging entry next to the destination that is then renamed over it. An
//! interrupted run leaves either the old entry or the new one in place.

use crate::path::{clean, is_within};

use std::{
    ffi::OsString,
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Kind of file system entry found at a path without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing exists at the path.
    Absent,

    /// Symbolic link, dangling or not.
    Symlink,

    /// Regular file.
    File,

    /// Directory, device, socket, and so on.
    Other,
}

/// Determine kind of entry at path without following symlinks.
///
/// # Errors
///
/// - Return [`io::Error`] if the entry cannot be inspected for any reason
///   other than not existing.
pub fn entry_kind(path: impl AsRef<Path>) -> io::Result<EntryKind> {
    match fs::symlink_metadata(path.as_ref()) {
        Ok(metadata) if metadata.file_type().is_symlink() => Ok(EntryKind::Symlink),
        Ok(metadata) if metadata.is_file() => Ok(EntryKind::File),
        Ok(_) => Ok(EntryKind::Other),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(EntryKind::Absent),
        Err(error) => Err(error),
    }
}

/// Check if path resolves to a regular file, following symlinks.
pub fn is_regular_file(path: impl AsRef<Path>) -> bool {
    fs::metadata(path.as_ref()).is_ok_and(|metadata| metadata.is_file())
}

/// Create all missing parent directories of path.
///
/// # Errors
///
/// - Return [`io::Error`] if any directory cannot be created.
pub fn ensure_parent(path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Copy regular file content and permissions.
///
/// Creates parent directories of the destination as needed. Follows symlinks
/// at the source.
///
/// # Errors
///
/// - Return [`io::Error`] if source is not a regular file, or if copying
///   fails.
pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !fs::metadata(src)?.is_file() {
        return Err(io::Error::other("source is not a regular file"));
    }

    ensure_parent(dst)?;
    fs::copy(src, dst)?;

    Ok(())
}

/// Move file, falling back to copy and delete across file systems.
///
/// # Errors
///
/// - Return [`io::Error`] if the rename fails for any reason other than the
///   destination being on another device, or if the fallback fails.
pub fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(error) if crosses_devices(&error) => {
            debug!("{} is on another device, copy instead", dst.display());
            copy_file(src, dst)?;
            fs::remove_file(src)
        }
        Err(error) => Err(error),
    }
}

#[cfg(unix)]
fn crosses_devices(error: &io::Error) -> bool {
    // EXDEV
    error.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn crosses_devices(error: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    error.raw_os_error() == Some(17)
}

/// Compare full byte content of two files.
///
/// # Errors
///
/// - Return [`io::Error`] if either file cannot be read.
pub fn files_equal(left: impl AsRef<Path>, right: impl AsRef<Path>) -> io::Result<bool> {
    let (left, right) = (left.as_ref(), right.as_ref());
    if fs::metadata(left)?.len() != fs::metadata(right)?.len() {
        return Ok(false);
    }

    Ok(fs::read(left)? == fs::read(right)?)
}

/// Check if symlink resolves to target.
///
/// Both sides are fully resolved before comparison, so differently spelled
/// paths to the same file compare equal.
///
/// # Errors
///
/// - Return [`io::Error`] if either side cannot be resolved, e.g., dangling
///   symlink.
pub fn symlink_points_to(link: impl AsRef<Path>, target: impl AsRef<Path>) -> io::Result<bool> {
    Ok(fs::canonicalize(link.as_ref())? == fs::canonicalize(target.as_ref())?)
}

/// Check if path reaches inside root once its parent directories are resolved.
///
/// The final component is left alone, only the nearest existing ancestor is
/// resolved. A live path whose parent directory is a symlink into the
/// repository thus names a repository entry, even though the entry itself
/// looks like a plain file.
pub fn resolves_into(path: impl AsRef<Path>, root: impl AsRef<Path>) -> bool {
    let Ok(root) = fs::canonicalize(root.as_ref()) else {
        return false;
    };

    let mut ancestor = path.as_ref().parent();
    while let Some(dir) = ancestor {
        match fs::canonicalize(dir) {
            Ok(resolved) => return is_within(&root, resolved),
            Err(_) => ancestor = dir.parent(),
        }
    }

    false
}

/// Determine target of symlink if it lies inside a repository.
///
/// Relative link targets are resolved against the directory holding the link.
/// Containment is purely lexical on cleaned absolute paths, so a dangling
/// target can still count as inside.
///
/// # Errors
///
/// - Return [`io::Error`] if the link cannot be read.
pub fn repo_link_target(
    link: impl AsRef<Path>,
    repo_root: impl AsRef<Path>,
) -> io::Result<Option<PathBuf>> {
    let link = link.as_ref();
    let raw = fs::read_link(link)?;
    let target = match link.parent() {
        Some(parent) if raw.is_relative() => clean(parent.join(raw)),
        _ => clean(raw),
    };

    Ok(is_within(repo_root, &target).then_some(target))
}

/// Create symlink at link pointing to target.
///
/// # Errors
///
/// - Return [`io::Error`] if the link cannot be created, e.g., something
///   already exists at its path.
#[cfg(unix)]
pub fn symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub fn symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Replace whatever lives at path with a symlink to target.
///
/// Missing parent directories are created. The symlink is staged next to
/// the path, then renamed over it.
///
/// # Errors
///
/// - Return [`io::Error`] if staging or renaming fails. The original entry
///   stays in place in that case.
pub fn replace_with_symlink(target: impl AsRef<Path>, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let staging = staging_path(path)?;
    symlink(target, &staging)?;
    commit_staged(&staging, path)
}

/// Replace whatever lives at path with an independent copy of source.
///
/// Missing parent directories are created. The copy is staged next to the
/// path, then renamed over it.
///
/// # Errors
///
/// - Return [`io::Error`] if the source is not a regular file, or if staging
///   or renaming fails. The original entry stays in place in that case.
pub fn replace_with_copy(src: impl AsRef<Path>, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let staging = staging_path(path)?;
    if let Err(error) = copy_file(src, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(error);
    }
    commit_staged(&staging, path)
}

fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{} has no file name", path.display())))?;
    let mut staged = OsString::from(".");
    staged.push(name);
    staged.push(format!(".cfgs-staged.{}", std::process::id()));
    let staging = path.with_file_name(staged);

    // INVARIANT: Only discard leftover symlinks, never somebody's file.
    match entry_kind(&staging)? {
        EntryKind::Absent => Ok(staging),
        EntryKind::Symlink => {
            fs::remove_file(&staging)?;
            Ok(staging)
        }
        EntryKind::File | EntryKind::Other => Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("staging path {} is occupied", staging.display()),
        )),
    }
}

fn commit_staged(staging: &Path, path: &Path) -> io::Result<()> {
    fs::rename(staging, path).inspect_err(|_| {
        let _ = fs::remove_file(staging);
    })
}

/// Remove empty directories from dir upward, stopping at root.
///
/// Root itself is never removed. Stops silently at the first directory that
/// is not empty or cannot be removed.
pub fn prune_empty_dirs(root: impl AsRef<Path>, dir: impl AsRef<Path>) {
    let root = clean(root);
    let mut dir = clean(dir);

    while dir != root && is_within(&root, &dir) {
        let is_empty = fs::read_dir(&dir).is_ok_and(|mut entries| entries.next().is_none());
        if !is_empty || fs::remove_dir(&dir).is_err() {
            return;
        }

        debug!("pruned empty directory {}", dir.display());
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return,
        }
    }
}

/// Require path to be missing or an empty directory.
///
/// # Errors
///
/// - Return [`io::Error`] if path is occupied by a file or a non-empty
///   directory, or if it cannot be inspected.
pub fn ensure_empty_or_missing_dir(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
        Ok(metadata) if !metadata.is_dir() => Err(io::Error::other(format!(
            "destination exists and is not a directory: {}",
            path.display()
        ))),
        Ok(_) if fs::read_dir(path)?.next().is_some() => Err(io::Error::other(format!(
            "destination exists and is not empty: {}",
            path.display()
        ))),
        Ok(_) => Ok(()),
    }
}

/// Write file content, creating parent directories as needed.
///
/// # Errors
///
/// - Return [`io::Error`] if directories or file cannot be written.
pub fn write_file(path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> io::Result<()> {
    ensure_parent(path.as_ref())?;
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn root() -> PathBuf {
        std::env::current_dir().unwrap()
    }

    #[sealed_test]
    fn entry_kind_does_not_follow_links() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("file"), "content")?;
        fs::create_dir(root.join("dir"))?;
        symlink(root.join("missing"), root.join("dangling"))?;

        assert_eq!(entry_kind(root.join("file"))?, EntryKind::File);
        assert_eq!(entry_kind(root.join("dir"))?, EntryKind::Other);
        assert_eq!(entry_kind(root.join("dangling"))?, EntryKind::Symlink);
        assert_eq!(entry_kind(root.join("nothing"))?, EntryKind::Absent);

        Ok(())
    }

    #[sealed_test]
    fn move_file_relocates_content() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("live/app.conf"), "key = value\n")?;
        fs::create_dir_all(root.join("repo/app"))?;

        move_file(root.join("live/app.conf"), root.join("repo/app/app.conf"))?;

        assert_eq!(entry_kind(root.join("live/app.conf"))?, EntryKind::Absent);
        assert_eq!(fs::read_to_string(root.join("repo/app/app.conf"))?, "key = value\n");

        Ok(())
    }

    #[sealed_test]
    fn copy_file_rejects_directories() -> anyhow::Result<()> {
        let root = root();
        fs::create_dir(root.join("dir"))?;

        assert!(copy_file(root.join("dir"), root.join("copy")).is_err());
        assert_eq!(entry_kind(root.join("copy"))?, EntryKind::Absent);

        Ok(())
    }

    #[sealed_test]
    fn files_equal_compares_bytes() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("a"), "same")?;
        write_file(root.join("b"), "same")?;
        write_file(root.join("c"), "diff")?;
        write_file(root.join("d"), "longer")?;

        assert!(files_equal(root.join("a"), root.join("b"))?);
        assert!(!files_equal(root.join("a"), root.join("c"))?);
        assert!(!files_equal(root.join("a"), root.join("d"))?);
        assert!(files_equal(root.join("a"), root.join("missing")).is_err());

        Ok(())
    }

    #[sealed_test]
    fn symlink_resolution() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("repo/a"), "a")?;
        write_file(root.join("repo/b"), "b")?;
        symlink(root.join("repo/a"), root.join("link"))?;
        symlink("repo/./a", root.join("relative"))?;

        assert!(symlink_points_to(root.join("link"), root.join("repo/a"))?);
        assert!(symlink_points_to(root.join("relative"), root.join("repo/a"))?);
        assert!(!symlink_points_to(root.join("link"), root.join("repo/b"))?);

        fs::remove_file(root.join("repo/a"))?;
        assert!(symlink_points_to(root.join("link"), root.join("repo/a")).is_err());

        Ok(())
    }

    #[sealed_test]
    fn repo_link_target_is_lexical() -> anyhow::Result<()> {
        let root = root();
        fs::create_dir_all(root.join("live/nvim"))?;
        symlink(root.join("repo/gone"), root.join("live/dangling"))?;
        symlink("../../repo/nvim/init.lua", root.join("live/nvim/init.lua"))?;
        symlink(root.join("elsewhere/x"), root.join("live/outside"))?;

        let repo = root.join("repo");
        assert_eq!(
            repo_link_target(root.join("live/dangling"), &repo)?,
            Some(root.join("repo/gone"))
        );
        assert_eq!(
            repo_link_target(root.join("live/nvim/init.lua"), &repo)?,
            Some(root.join("repo/nvim/init.lua"))
        );
        assert_eq!(repo_link_target(root.join("live/outside"), &repo)?, None);

        Ok(())
    }

    #[sealed_test]
    fn replace_with_symlink_swaps_file() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("repo/x"), "x")?;
        write_file(root.join("live/x"), "x")?;

        replace_with_symlink(root.join("repo/x"), root.join("live/x"))?;
        replace_with_symlink(root.join("repo/x"), root.join("live/new/y"))?;

        assert_eq!(entry_kind(root.join("live/x"))?, EntryKind::Symlink);
        assert!(symlink_points_to(root.join("live/x"), root.join("repo/x"))?);
        assert_eq!(entry_kind(root.join("live/new/y"))?, EntryKind::Symlink);
        assert_eq!(fs::read_dir(root.join("live"))?.count(), 2);

        Ok(())
    }

    #[sealed_test]
    fn replace_with_copy_swaps_symlink() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("repo/x"), "payload")?;
        fs::create_dir(root.join("live"))?;
        symlink(root.join("repo/x"), root.join("live/x"))?;

        replace_with_copy(root.join("repo/x"), root.join("live/x"))?;

        assert_eq!(entry_kind(root.join("live/x"))?, EntryKind::File);
        assert_eq!(fs::read_to_string(root.join("live/x"))?, "payload");
        assert_eq!(fs::read_to_string(root.join("repo/x"))?, "payload");

        Ok(())
    }

    #[sealed_test]
    fn replace_with_copy_keeps_original_on_failure() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("live/x"), "original")?;

        assert!(replace_with_copy(root.join("missing"), root.join("live/x")).is_err());
        assert_eq!(fs::read_to_string(root.join("live/x"))?, "original");
        assert_eq!(fs::read_dir(root.join("live"))?.count(), 1);

        Ok(())
    }

    #[sealed_test]
    fn staging_never_discards_regular_files() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("repo/x"), "repo")?;
        write_file(root.join("live/x"), "x")?;
        let occupied = staging_path(&root.join("live/x"))?;
        write_file(&occupied, "mine")?;

        assert!(replace_with_symlink(root.join("repo/x"), root.join("live/x")).is_err());
        assert!(replace_with_copy(root.join("repo/x"), root.join("live/x")).is_err());
        assert_eq!(fs::read_to_string(&occupied)?, "mine");
        assert_eq!(fs::read_to_string(root.join("live/x"))?, "x");

        fs::remove_file(&occupied)?;
        symlink(root.join("repo/x"), &occupied)?;
        replace_with_copy(root.join("repo/x"), root.join("live/x"))?;
        assert_eq!(fs::read_to_string(root.join("live/x"))?, "repo");
        assert_eq!(entry_kind(&occupied)?, EntryKind::Absent);

        Ok(())
    }

    #[sealed_test]
    fn resolves_into_follows_parent_links() -> anyhow::Result<()> {
        let root = root();
        write_file(root.join("repo/nvim/init.lua"), "x")?;
        fs::create_dir_all(root.join("live/zsh"))?;
        symlink(root.join("repo/nvim"), root.join("live/nvim"))?;
        symlink(root.join("repo/nvim/init.lua"), root.join("live/zsh/zshrc"))?;

        let repo = root.join("repo");
        assert!(resolves_into(root.join("live/nvim/init.lua"), &repo));
        assert!(resolves_into(root.join("live/nvim/deep/new.lua"), &repo));
        assert!(!resolves_into(root.join("live/zsh/zshrc"), &repo));
        assert!(!resolves_into(root.join("live/missing/file"), &repo));
        assert!(!resolves_into(root.join("live/nvim/init.lua"), root.join("nowhere")));

        Ok(())
    }

    #[sealed_test]
    fn prune_stops_at_root_and_content() -> anyhow::Result<()> {
        let root = root();
        let repo = root.join("repo");
        fs::create_dir_all(repo.join("a/b/c"))?;
        write_file(repo.join("a/keep"), "keep")?;

        prune_empty_dirs(&repo, repo.join("a/b/c"));
        assert_eq!(entry_kind(repo.join("a/b"))?, EntryKind::Absent);
        assert_eq!(entry_kind(repo.join("a"))?, EntryKind::Other);

        fs::remove_file(repo.join("a/keep"))?;
        prune_empty_dirs(&repo, repo.join("a"));
        assert_eq!(entry_kind(repo.join("a"))?, EntryKind::Absent);
        assert_eq!(entry_kind(&repo)?, EntryKind::Other);

        Ok(())
    }

    #[sealed_test]
    fn empty_or_missing_destination() -> anyhow::Result<()> {
        let root = root();
        fs::create_dir(root.join("empty"))?;
        write_file(root.join("full/file"), "x")?;

        assert!(ensure_empty_or_missing_dir(root.join("missing")).is_ok());
        assert!(ensure_empty_or_missing_dir(root.join("empty")).is_ok());
        assert!(ensure_empty_or_missing_dir(root.join("full")).is_err());
        assert!(ensure_empty_or_missing_dir(root.join("full/file")).is_err());

        Ok(())
    }
}
