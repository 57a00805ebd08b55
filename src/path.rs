// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that cfgs needs to interact
//! with. The centerpiece is [`normalize`], which turns untrusted input from the
//! user, the picker, or `git ls-files` into a [`ManagedPath`]. Nothing touches
//! the file system with a relative path that did not pass through it.

use std::{
    env,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Component, Path, PathBuf, MAIN_SEPARATOR},
    str::FromStr,
};

/// Name of version control metadata directory at the top of the repository.
pub const METADATA_DIR: &str = ".git";

/// Relative path of a file managed by the repository.
///
/// Always slash-separated, lexically clean, relative, free of traversal, and
/// never inside [`METADATA_DIR`]. The same relative path locates the
/// repository copy under the repository root, and the live entry under the
/// live root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManagedPath(String);

impl ManagedPath {
    /// Slash-separated string form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Locate this path under a root directory.
    pub fn under(&self, root: impl AsRef<Path>) -> PathBuf {
        let mut path = root.as_ref().to_path_buf();
        path.extend(self.0.split('/'));
        path
    }
}

impl Display for ManagedPath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for ManagedPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self> {
        normalize(raw)
    }
}

impl AsRef<str> for ManagedPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Normalize raw relative path into a [`ManagedPath`].
///
/// Converts platform separators to forward slashes, trims whitespace, and
/// lexically resolves `.` and `..` segments without touching the file system.
///
/// # Errors
///
/// - Return [`PathError::Empty`] if nothing remains after cleaning.
/// - Return [`PathError::Absolute`] for absolute paths.
/// - Return [`PathError::Traversal`] if the path escapes its root.
/// - Return [`PathError::Reserved`] for the metadata directory or its contents.
pub fn normalize(raw: impl AsRef<str>) -> Result<ManagedPath> {
    let slashed = raw.as_ref().trim().replace(MAIN_SEPARATOR, "/");
    let cleaned = clean_slashed(&slashed);

    if cleaned.is_empty() || cleaned == "." {
        return Err(PathError::Empty);
    }

    if cleaned.starts_with('/') {
        return Err(PathError::Absolute);
    }

    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(PathError::Traversal);
    }

    if is_metadata_path(&cleaned) {
        return Err(PathError::Reserved);
    }

    Ok(ManagedPath(cleaned))
}

/// Check if slash-separated relative path names version control metadata.
pub fn is_metadata_path(rel: &str) -> bool {
    rel == METADATA_DIR
        || rel
            .strip_prefix(METADATA_DIR)
            .is_some_and(|rest| rest.starts_with('/'))
}

// Lexical cleaning of slash-separated paths, same rules as POSIX path.Clean.
fn clean_slashed(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => continue,
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".into(),
        (false, false) => joined,
    }
}

/// Lexically clean file system path.
///
/// Removes `.` components and folds `..` into its parent where possible. Does
/// not resolve symlinks, so the result may name a different file than the
/// input if symlinked directories are involved.
pub fn clean(path: impl AsRef<Path>) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => continue,
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other),
        }
    }

    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }

    cleaned
}

/// Check if candidate lies inside base, or is base itself, lexically.
pub fn is_within(base: impl AsRef<Path>, candidate: impl AsRef<Path>) -> bool {
    clean(candidate).starts_with(clean(base))
}

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf, NoWayHome> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine live root that holds user configuration files.
///
/// Uses `$XDG_CONFIG_HOME` when it is set to something other than blank
/// space, otherwise falls back to `~/.config`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn live_root() -> Result<PathBuf, NoWayHome> {
    match env::var("XDG_CONFIG_HOME") {
        Ok(configured) if !configured.trim().is_empty() => Ok(PathBuf::from(configured.trim())),
        _ => Ok(home_dir()?.join(".config")),
    }
}

/// Trim user input and expand leading tilde to home directory.
pub fn expand(input: impl AsRef<str>) -> PathBuf {
    PathBuf::from(shellexpand::tilde(input.as_ref().trim()).into_owned())
}

/// Guess if user input names a remote repository rather than a local path.
pub fn looks_like_remote(input: impl AsRef<str>) -> bool {
    let input = input.as_ref();
    ["http://", "https://", "ssh://", "git@"]
        .iter()
        .any(|prefix| input.starts_with(prefix))
        || is_scp_like(input)
}

// Matches `user@host:path` remotes.
fn is_scp_like(input: &str) -> bool {
    let plain = |part: &str| !part.is_empty() && !part.chars().any(|c| c == '/' || c.is_whitespace());

    let Some((user, rest)) = input.split_once('@') else {
        return false;
    };
    let Some((host, path)) = rest.split_once(':') else {
        return false;
    };

    plain(user) && plain(host) && !path.is_empty()
}

/// Relative path rejected by [`normalize`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing left after cleaning.
    #[error("invalid path")]
    Empty,

    /// Path starts at file system root.
    #[error("absolute paths are not allowed")]
    Absolute,

    /// Path climbs out of its root.
    #[error("path traversal is not allowed")]
    Traversal,

    /// Path names version control metadata.
    #[error("path is reserved")]
    Reserved,
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
type Result<T, E = PathError> = std::result::Result<T, E>;
