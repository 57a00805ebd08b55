// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control collaborator.
//!
//! Cfgs never interprets repository history itself. Everything it needs from
//! version control goes through the narrow [`Vcs`] trait, which [`GitCli`]
//! implements by running the `git` binary. Failures carry the command line and
//! its raw output, nothing more.

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::{OsStr, OsString},
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Output},
    time::Duration,
};
use tracing::{debug, info, instrument};

/// Capabilities cfgs needs from version control.
pub trait Vcs {
    /// List tracked files relative to repository root.
    fn tracked_files(&self, repo: &Path) -> Result<Vec<String>>;

    /// Check if working tree has uncommitted changes.
    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    /// Current revision identifier, or nothing if there is no history yet.
    fn head(&self, repo: &Path) -> Result<Option<String>>;

    /// Stage all changes and commit through the user's editor.
    fn commit_all(&self, repo: &Path) -> Result<()>;

    /// Push to configured remote.
    fn push(&self, repo: &Path) -> Result<()>;

    /// Clone remote into destination directory.
    fn clone_into(&self, url: &str, dest: &Path) -> Result<()>;

    /// Resolve top-level directory of repository containing path.
    fn repo_root(&self, path: &Path) -> Result<PathBuf>;

    /// List names of configured remotes.
    fn remotes(&self, repo: &Path) -> Result<Vec<String>>;
}

/// Version control through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    /// Construct new git caller around target binary.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Make sure git binary can be run at all.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::Spawn`] if the binary is missing.
    pub fn ensure_available(&self) -> Result<()> {
        self.run(None, ["--version"]).map(|_| ())
    }

    /// Pull from remote, rebasing local commits and stashing local changes.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if the pull fails, e.g., conflicts.
    #[instrument(skip(self), level = "debug")]
    pub fn pull(&self, repo: &Path) -> Result<()> {
        with_spinner("pulling latest changes", || {
            self.run(Some(repo), ["pull", "--rebase", "--autostash"])
        })
        .map(|_| ())
    }

    /// Abort any rebase or merge left in progress.
    ///
    /// Failures are ignored, since usually nothing is in progress.
    pub fn abort_in_progress(&self, repo: &Path) {
        for args in [["rebase", "--abort"], ["merge", "--abort"]] {
            if let Err(error) = self.run(Some(repo), args) {
                debug!("nothing to abort: {error}");
            }
        }
    }

    /// Short working tree status.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if git fails.
    pub fn status_short(&self, repo: &Path) -> Result<String> {
        self.run(Some(repo), ["--no-pager", "status", "--short"])
    }

    /// Show diff between two revisions on the terminal.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if git fails.
    pub fn show_range(&self, repo: &Path, from: &str, to: &str) -> Result<()> {
        let range = format!("{from}..{to}");
        self.run_interactive(Some(repo), ["--no-pager", "diff", range.as_str()])
    }

    /// Show single commit on the terminal.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if git fails.
    pub fn show_commit(&self, repo: &Path, rev: &str) -> Result<()> {
        self.run_interactive(Some(repo), ["--no-pager", "show", rev])
    }

    /// Show uncommitted changes on the terminal.
    ///
    /// Diffs against HEAD when history exists, against the index otherwise.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if git fails.
    pub fn show_worktree_diff(&self, repo: &Path, has_head: bool) -> Result<()> {
        if has_head {
            self.run_interactive(Some(repo), ["--no-pager", "diff", "HEAD"])
        } else {
            self.run_interactive(Some(repo), ["--no-pager", "diff"])
        }
    }

    fn command(&self, dir: Option<&Path>, args: &[OsString]) -> (Command, String) {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let mut line = self.program.to_string_lossy().into_owned();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }

        (command, line)
    }

    fn probe(
        &self,
        dir: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<(Output, String)> {
        let args = args.into_iter().map(|arg| arg.as_ref().to_os_string()).collect::<Vec<_>>();
        let (mut command, line) = self.command(dir, &args);
        debug!("run {line}");
        let output = command.output().map_err(|source| self.spawn_error(source))?;

        Ok((output, line))
    }

    fn run(
        &self,
        dir: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<String> {
        let (output, line) = self.probe(dir, args)?;
        let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
        let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

        if !output.status.success() {
            let mut message = stdout.trim().to_string();
            if !stderr.trim().is_empty() {
                if !message.is_empty() {
                    message.push('\n');
                }
                message.push_str(stderr.trim());
            }

            return Err(VcsError::Failed {
                command: line,
                output: message,
            });
        }

        Ok(stdout.trim().to_string())
    }

    fn run_interactive(
        &self,
        dir: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<()> {
        let args = args.into_iter().map(|arg| arg.as_ref().to_os_string()).collect::<Vec<_>>();
        let (mut command, line) = self.command(dir, &args);
        debug!("run interactive {line}");
        let status = command.status().map_err(|source| self.spawn_error(source))?;
        if !status.success() {
            return Err(VcsError::Failed {
                command: line,
                output: format!("exited with {status}"),
            });
        }

        Ok(())
    }

    fn spawn_error(&self, source: std::io::Error) -> VcsError {
        VcsError::Spawn {
            program: self.program.to_string_lossy().into_owned(),
            missing: source.kind() == ErrorKind::NotFound,
            source,
        }
    }
}

impl Vcs for GitCli {
    fn tracked_files(&self, repo: &Path) -> Result<Vec<String>> {
        let (output, line) = self.probe(Some(repo), ["ls-files", "-z"])?;
        if !output.status.success() {
            return Err(VcsError::Failed {
                command: line,
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // INVARIANT: NUL separated output keeps unusual file names unquoted.
        Ok(output
            .stdout
            .split(|byte| *byte == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| String::from_utf8_lossy(entry).into_owned())
            .collect())
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        Ok(!self.run(Some(repo), ["status", "--porcelain"])?.is_empty())
    }

    fn head(&self, repo: &Path) -> Result<Option<String>> {
        let (output, _) = self.probe(Some(repo), ["rev-parse", "--verify", "--quiet", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }

        let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!head.is_empty()).then_some(head))
    }

    #[instrument(skip(self), level = "debug")]
    fn commit_all(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), ["add", "-A"])?;
        info!("opening editor for commit message");
        self.run_interactive(Some(repo), ["commit"])
    }

    #[instrument(skip(self), level = "debug")]
    fn push(&self, repo: &Path) -> Result<()> {
        with_spinner("pushing to remote", || self.run(Some(repo), ["push"])).map(|_| ())
    }

    #[instrument(skip(self), level = "debug")]
    fn clone_into(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.as_os_str();
        with_spinner(format!("cloning {url}"), || {
            self.run(None, [OsStr::new("clone"), OsStr::new(url), dest])
        })
        .map(|_| ())
    }

    fn repo_root(&self, path: &Path) -> Result<PathBuf> {
        self.run(Some(path), ["rev-parse", "--show-toplevel"])
            .map(PathBuf::from)
    }

    fn remotes(&self, repo: &Path) -> Result<Vec<String>> {
        Ok(self
            .run(Some(repo), ["remote"])?
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

fn with_spinner<T>(message: impl Into<String>, task: impl FnOnce() -> Result<T>) -> Result<T> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    let result = task();
    bar.finish_and_clear();

    result
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Binary could not be started at all.
    #[error("{}", spawn_message(program, *missing))]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
        missing: bool,
    },

    /// Command ran but reported failure.
    #[error("{command} failed:\n{output}")]
    Failed { command: String, output: String },

    /// Style template cannot be set for spinners.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

fn spawn_message(program: &str, missing: bool) -> String {
    if missing {
        format!("missing required commands: {program}")
    } else {
        format!("failed to run {program}")
    }
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;
