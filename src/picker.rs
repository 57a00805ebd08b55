// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive multi-select picker.
//!
//! Users choose which files to add, remove, or unlink through a [`Picker`].
//! [`Fzf`] is preferred, with a file preview of the live copy. When `fzf` is
//! not installed, [`MenuPicker`] falls back to a plain terminal menu.
//!
//! Cancelling the picker is not an error. It simply selects nothing.

use inquire::{InquireError, MultiSelect};
use std::{
    io::{ErrorKind, Write},
    path::PathBuf,
    process::{Command, Stdio},
};
use tracing::debug;

const FZF_PREVIEW: &str = r#"p="$XDG_CONFIG_HOME"/{}; if [ -f "$p" ]; then (bat --style=plain --color=always --line-range=:200 "$p" 2>/dev/null || sed -n "1,200p" "$p"); else echo "No preview: $p"; fi"#;

/// Pick a subset of candidate paths.
pub trait Picker {
    /// Let the user choose among items.
    ///
    /// Returns selection sorted and without duplicates, possibly empty.
    fn select(&self, items: &[String], prompt: &str) -> Result<Vec<String>>;
}

/// Picker backed by the `fzf` binary.
#[derive(Debug, Clone)]
pub struct Fzf {
    live_root: PathBuf,
}

impl Fzf {
    /// Construct new fzf picker previewing files under live root.
    pub fn new(live_root: impl Into<PathBuf>) -> Self {
        Self {
            live_root: live_root.into(),
        }
    }

    /// Check if fzf binary can be run.
    pub fn is_available() -> bool {
        Command::new("fzf")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

impl Picker for Fzf {
    fn select(&self, items: &[String], prompt: &str) -> Result<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = Command::new("fzf")
            .args(["--multi", "--prompt", prompt, "--preview", FZF_PREVIEW])
            .args(["--preview-window", "right,60%,border-left,wrap"])
            .env("XDG_CONFIG_HOME", &self.live_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(PickerError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = items.join("\n");
            input.push('\n');
            if let Err(error) = stdin.write_all(input.as_bytes()) {
                // INVARIANT: fzf may quit before reading everything.
                if error.kind() != ErrorKind::BrokenPipe {
                    return Err(PickerError::Spawn(error));
                }
            }
        }

        let output = child.wait_with_output().map_err(PickerError::Spawn)?;
        if !output.status.success() {
            // INVARIANT: 1 means no match, 130 means interrupted.
            if matches!(output.status.code(), Some(1 | 130)) {
                debug!("fzf selection cancelled");
                return Ok(Vec::new());
            }

            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(PickerError::Failed(message));
        }

        Ok(tidy(String::from_utf8_lossy(&output.stdout).lines()))
    }
}

/// Picker drawn directly in the terminal.
#[derive(Debug, Default, Clone)]
pub struct MenuPicker;

impl Picker for MenuPicker {
    fn select(&self, items: &[String], prompt: &str) -> Result<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        match MultiSelect::new(prompt, items.to_vec()).prompt() {
            Ok(selected) => Ok(tidy(selected)),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                debug!("menu selection cancelled");
                Ok(Vec::new())
            }
            Err(error) => Err(PickerError::Menu(error)),
        }
    }
}

/// Choose best available picker.
pub fn default_picker(live_root: impl Into<PathBuf>) -> Box<dyn Picker> {
    if Fzf::is_available() {
        Box::new(Fzf::new(live_root))
    } else {
        debug!("fzf not found, falling back to menu picker");
        Box::new(MenuPicker)
    }
}

fn tidy(lines: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut selected = lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    selected.sort();
    selected.dedup();

    selected
}

/// Picker error types.
#[derive(Debug, thiserror::Error)]
pub enum PickerError {
    /// Picker process could not be run.
    #[error("failed to run fzf")]
    Spawn(#[source] std::io::Error),

    /// Picker process failed for a reason other than cancellation.
    #[error("fzf failed: {0}")]
    Failed(String),

    /// Terminal menu failed.
    #[error(transparent)]
    Menu(#[from] InquireError),
}

/// Friendly result alias :3
pub type Result<T, E = PickerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tidy_trims_sorts_and_dedups() {
        let result = tidy(["  b/x \n", "", "a/y", "b/x", "   "]);
        assert_eq!(result, vec!["a/y".to_string(), "b/x".to_string()]);
    }

    #[test]
    fn empty_candidates_skip_picker() {
        assert!(Fzf::new("/nowhere").select(&[], "add> ").unwrap().is_empty());
        assert!(MenuPicker.select(&[], "add> ").unwrap().is_empty());
    }
}
