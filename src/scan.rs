// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Live root scanning.
//!
//! Walks the live root to find candidate files for tracking, and symlinks for
//! the orphan pass of the reconciliation engine. Ignored directories are never
//! descended into. Symlinks are reported as entries of their own, never
//! followed.

use crate::{
    matcher::IgnoreMatcher,
    path::{normalize, ManagedPath},
};

use ignore::{DirEntry, WalkBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Symlink found in the live root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveLink {
    /// Absolute path of the link itself.
    pub path: PathBuf,

    /// Path of the link relative to the live root.
    pub rel: ManagedPath,
}

/// List regular files under live root that are not ignored.
///
/// Entries that cannot be read are skipped, so one unreadable directory does
/// not abort a large scan. A missing live root yields nothing.
#[instrument(skip(ignore), level = "debug")]
pub fn regular_files(live_root: &Path, ignore: &IgnoreMatcher) -> Vec<ManagedPath> {
    let mut files = walk(live_root, ignore)
        .filter(|(entry, _)| entry.file_type().is_some_and(|kind| kind.is_file()))
        .map(|(_, rel)| rel)
        .collect::<Vec<_>>();
    files.sort();
    files.dedup();

    debug!("found {} candidate files", files.len());
    files
}

/// List symlinks under live root that are not ignored.
///
/// # Errors
///
/// - Return [`ScanError::Root`] if live root itself cannot be read. Errors
///   for entries below it are skipped.
#[instrument(skip(ignore), level = "debug")]
pub fn symlinks(live_root: &Path, ignore: &IgnoreMatcher) -> Result<Vec<LiveLink>> {
    fs::read_dir(live_root).map_err(|source| ScanError::Root {
        source,
        live_root: live_root.to_path_buf(),
    })?;

    let mut links = walk(live_root, ignore)
        .filter(|(entry, _)| entry.path_is_symlink())
        .map(|(entry, rel)| LiveLink {
            path: entry.into_path(),
            rel,
        })
        .collect::<Vec<_>>();
    links.sort_by(|left, right| left.rel.cmp(&right.rel));

    Ok(links)
}

// Every entry below live root that survives the ignore rules, paired with its
// normalized relative path.
fn walk(
    live_root: &Path,
    ignore: &IgnoreMatcher,
) -> impl Iterator<Item = (DirEntry, ManagedPath)> {
    let filter_root = live_root.to_path_buf();
    let filter_ignore = ignore.clone();
    let root = live_root.to_path_buf();

    WalkBuilder::new(live_root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|left, right| left.cmp(right))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }

            let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
            match relative_slashed(&filter_root, entry.path()) {
                Some(rel) => !filter_ignore.is_ignored(rel, is_dir),
                None => false,
            }
        })
        .build()
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(error) => {
                debug!("skip unreadable entry: {error}");
                None
            }
        })
        .filter(|entry| entry.depth() > 0)
        .filter_map(move |entry| {
            let rel = relative_slashed(&root, entry.path())?;
            normalize(rel).ok().map(|rel| (entry, rel))
        })
}

fn relative_slashed(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments = rel
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>();

    Some(segments.join("/"))
}

/// Live root scanning error types.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Live root cannot be read at all.
    #[error("failed to read live root {:?}", live_root.display())]
    Root {
        #[source]
        source: std::io::Error,
        live_root: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = ScanError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{symlink, write_file};
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn strings(paths: &[ManagedPath]) -> Vec<&str> {
        paths.iter().map(ManagedPath::as_str).collect()
    }

    #[sealed_test]
    fn regular_files_skip_ignored_and_links() -> anyhow::Result<()> {
        let live = std::env::current_dir()?.join("live");
        write_file(live.join("nvim/init.lua"), "-- init")?;
        write_file(live.join("nvim/node_modules/pkg/index.js"), "x")?;
        write_file(live.join("node_modules/top.js"), "x")?;
        write_file(live.join(".hidden/rc"), "x")?;
        write_file(live.join("git/config"), "x")?;
        fs::create_dir_all(live.join("empty"))?;
        symlink(live.join("git/config"), live.join("linked"))?;

        let files = regular_files(&live, &IgnoreMatcher::default());
        assert_eq!(strings(&files), vec![".hidden/rc", "git/config", "nvim/init.lua"]);

        Ok(())
    }

    #[sealed_test]
    fn regular_files_honor_custom_patterns() -> anyhow::Result<()> {
        let live = std::env::current_dir()?.join("live");
        write_file(live.join("app/cache/blob"), "x")?;
        write_file(live.join("app/settings.json"), "x")?;
        write_file(live.join("app/debug.log"), "x")?;

        let ignore = IgnoreMatcher::compile(["app/cache", "**/*.log"])?;
        let files = regular_files(&live, &ignore);
        assert_eq!(strings(&files), vec!["app/settings.json"]);

        Ok(())
    }

    #[sealed_test]
    fn regular_files_of_missing_root() -> anyhow::Result<()> {
        let live = std::env::current_dir()?.join("missing");
        assert!(regular_files(&live, &IgnoreMatcher::default()).is_empty());

        Ok(())
    }

    #[sealed_test]
    fn symlinks_are_listed_not_followed() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let live = root.join("live");
        write_file(root.join("target/dir/file"), "x")?;
        write_file(live.join("plain"), "x")?;
        fs::create_dir_all(live.join("node_modules"))?;
        fs::create_dir_all(live.join("b"))?;
        symlink(root.join("target/dir/file"), live.join("b/file-link"))?;
        symlink(root.join("target/dir"), live.join("a-dir-link"))?;
        symlink(root.join("target/dir/file"), live.join("node_modules/hidden"))?;

        let links = symlinks(&live, &IgnoreMatcher::default())?;
        let rels = links.iter().map(|link| link.rel.as_str()).collect::<Vec<_>>();
        assert_eq!(rels, vec!["a-dir-link", "b/file-link"]);
        assert_eq!(links[1].path, live.join("b/file-link"));

        Ok(())
    }

    #[sealed_test]
    fn symlinks_of_missing_root_fail() -> anyhow::Result<()> {
        let live = std::env::current_dir()?.join("missing");
        assert!(matches!(
            symlinks(&live, &IgnoreMatcher::default()),
            Err(ScanError::Root { .. })
        ));

        Ok(())
    }
}
