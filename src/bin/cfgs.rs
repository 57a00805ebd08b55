// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use cfgs::{
    config::{self, config_path, CfgsConfig},
    files::ensure_empty_or_missing_dir,
    managed::repo_is_empty,
    matcher::{IgnoreMatcher, DEFAULT_IGNORE_GLOBS},
    path::{expand, home_dir, live_root, looks_like_remote},
    picker::{default_picker, Picker},
    repo::{self, REPO_ENV},
    scan,
    track::{track, unlink, untrack},
    vcs::{GitCli, Vcs},
    Doctor, ManagedSet, OperationReport, Workspace,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Text};
use std::{
    env,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "cfgs <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self, app: &App) -> Result<()> {
        match self.command {
            Command::Init => run_init(app),
            Command::Sync => run_sync(app),
            Command::Add => run_add(app),
            Command::Remove => run_remove(app),
            Command::Doctor => run_doctor(app),
            Command::Check => run_check(app),
            Command::Unlink => run_unlink(app),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize cfgs repository and track selected files.
    Init,

    /// Pull latest from remote and run doctor.
    Sync,

    /// Add more config files from XDG_CONFIG_HOME.
    Add,

    /// Remove tracked files from repository and restore local copies.
    Remove,

    /// Reconcile symlinks between repo and XDG_CONFIG_HOME.
    Doctor,

    /// Quick git clean check with optional commit/push.
    Check,

    /// Replace tracked symlinks with local copies.
    Unlink,
}

/// Everything resolved once at startup.
struct App {
    git: GitCli,
    live_root: PathBuf,
    config_path: PathBuf,
    config: Option<CfgsConfig>,
    repo_override: Option<String>,
}

impl App {
    fn load() -> Result<Self> {
        let git = GitCli::default();
        git.ensure_available()?;

        let live_root = live_root()?;
        let config_path = config_path(&live_root);
        let config = config::load(&config_path).context("read cfgs config")?;
        let repo_override = env::var(REPO_ENV).ok();
        debug!("live root {}", live_root.display());

        Ok(Self {
            git,
            live_root,
            config_path,
            config,
            repo_override,
        })
    }

    fn workspace(&self) -> Result<Workspace> {
        let repo_root = repo::resolve(
            self.repo_override.as_deref(),
            self.config.as_ref(),
            &self.git,
        )?;
        let ignore = match &self.config {
            Some(config) => config.ignore_matcher()?,
            None => IgnoreMatcher::default(),
        };

        Ok(Workspace::new(self.live_root.clone(), repo_root, ignore))
    }

    fn picker(&self) -> Box<dyn Picker> {
        default_picker(self.live_root.clone())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let app = App::load()?;
    cli.run(&app)
}

fn run_init(app: &App) -> Result<()> {
    let default_repo = home_dir()?.join(".cfgs");
    let default_repo = default_repo.to_string_lossy();

    let input = Text::new("Repository path or remote URL")
        .with_default(&default_repo)
        .prompt()?;
    let input = input.trim();
    let candidate = if looks_like_remote(input) {
        let dest = Text::new("Clone destination")
            .with_default(&default_repo)
            .prompt()?;
        let dest = expand(dest);
        ensure_empty_or_missing_dir(&dest)?;
        cfgs::vcs::Vcs::clone_into(&app.git, input, &dest)?;
        dest
    } else {
        expand(input)
    };

    let repo_root = repo::validate(&candidate.to_string_lossy(), &app.git)?;
    let ignore_globs = match &app.config {
        Some(config) if !config.ignore_globs.is_empty() => config.ignore_globs.clone(),
        _ => DEFAULT_IGNORE_GLOBS.iter().map(ToString::to_string).collect(),
    };
    let config = CfgsConfig::new(repo_root.to_string_lossy(), ignore_globs);
    config::save(&app.config_path, &config)?;

    let workspace = Workspace::new(app.live_root.clone(), repo_root, config.ignore_matcher()?);
    if !repo_is_empty(&app.git, workspace.repo_root())? {
        println!("Repository is not empty; running doctor.");
        return doctor(app, &workspace);
    }

    let candidates = scan::regular_files(workspace.live_root(), workspace.ignore())
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if candidates.is_empty() {
        println!("No files found in XDG_CONFIG_HOME.");
        return Ok(());
    }

    let selected = app.picker().select(&candidates, "init> ")?;
    if selected.is_empty() {
        println!("No files selected.");
        return Ok(());
    }

    let mut managed = ManagedSet::load(&app.git, workspace.repo_root())?;
    let report = track(&workspace, &mut managed, &selected, "init");
    finish(app, &workspace, report)
}

fn run_sync(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    let repo = workspace.repo_root();

    let before = app.git.head(repo)?;
    if let Err(error) = app.git.pull(repo) {
        app.git.abort_in_progress(repo);
        return Err(error).context(
            "sync failed; aborted any in-progress merge/rebase. Resolve manually with git pull + \
             conflict resolution",
        );
    }
    let after = app.git.head(repo)?;

    show_sync_diff(&app.git, repo, before.as_deref(), after.as_deref())?;
    doctor(app, &workspace)
}

fn run_add(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    let mut managed = ManagedSet::load(&app.git, workspace.repo_root())?;

    let candidates = scan::regular_files(workspace.live_root(), workspace.ignore())
        .into_iter()
        .filter(|rel| !managed.contains(rel))
        .map(|rel| rel.to_string())
        .collect::<Vec<_>>();
    if candidates.is_empty() {
        println!("No untracked files available to add.");
        return Ok(());
    }

    let selected = app.picker().select(&candidates, "add> ")?;
    if selected.is_empty() {
        println!("No files selected.");
        return Ok(());
    }

    let report = track(&workspace, &mut managed, &selected, "add");
    finish(app, &workspace, report)
}

fn run_remove(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    let mut managed = ManagedSet::load(&app.git, workspace.repo_root())?;
    if managed.is_empty() {
        println!("No tracked files to remove.");
        return Ok(());
    }

    let selected = app.picker().select(&managed.to_strings(), "remove> ")?;
    if selected.is_empty() {
        println!("No files selected.");
        return Ok(());
    }

    let report = untrack(&workspace, &mut managed, &selected);
    finish(app, &workspace, report)
}

fn run_doctor(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    doctor(app, &workspace)
}

fn run_check(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    let repo = workspace.repo_root();
    if !app.git.is_dirty(repo)? {
        println!("Git working tree is clean.");
        return Ok(());
    }

    show_check_diff(&app.git, repo)?;
    let commit_now = Confirm::new("Uncommitted changes detected. Commit them now?")
        .with_default(true)
        .prompt()?;
    if !commit_now {
        println!("Skipped commit.");
        return Ok(());
    }

    println!("Opening editor for commit message...");
    app.git.commit_all(repo)?;
    offer_push(&app.git, repo)?;

    doctor(app, &workspace)
}

fn run_unlink(app: &App) -> Result<()> {
    let workspace = app.workspace()?;
    let managed = ManagedSet::load(&app.git, workspace.repo_root())?;
    if managed.is_empty() {
        println!("No tracked files to unlink.");
        return Ok(());
    }

    let selected = app.picker().select(&managed.to_strings(), "unlink> ")?;
    if selected.is_empty() {
        println!("No files selected.");
        return Ok(());
    }

    print!("{}", unlink(&workspace, &managed, &selected));
    Ok(())
}

fn doctor(app: &App, workspace: &Workspace) -> Result<()> {
    let managed = ManagedSet::load(&app.git, workspace.repo_root())?;
    if managed.is_empty() {
        println!("No tracked files found.");
        return Ok(());
    }

    let report = Doctor::new(workspace).run(&managed)?;
    print!("{report}");
    if !report.is_converged() {
        bail!(
            "manual reconcile required for {} file(s)",
            report.require_manual_resolve.len()
        );
    }

    Ok(())
}

// Print report, then commit if anything changed on disk.
fn finish(app: &App, workspace: &Workspace, report: OperationReport) -> Result<()> {
    print!("{report}");
    if report.changed() {
        commit_and_offer_push(&app.git, workspace.repo_root())?;
    }

    Ok(())
}

fn commit_and_offer_push(git: &GitCli, repo: &Path) -> Result<()> {
    if !git.is_dirty(repo)? {
        return Ok(());
    }

    println!("Opening editor for commit message...");
    git.commit_all(repo)?;
    offer_push(git, repo)
}

fn offer_push(git: &GitCli, repo: &Path) -> Result<()> {
    let push_now = Confirm::new("Push commit now?")
        .with_default(false)
        .prompt()?;
    if push_now {
        git.push(repo)?;
    }

    Ok(())
}

fn show_sync_diff(
    git: &GitCli,
    repo: &Path,
    before: Option<&str>,
    after: Option<&str>,
) -> Result<()> {
    match (before, after) {
        (Some(before), Some(after)) if before == after => {
            println!("sync: already up to date.");
        }
        (Some(before), Some(after)) => {
            println!(
                "sync: pulled updates ({}..{})",
                short_hash(before),
                short_hash(after)
            );
            git.show_range(repo, before, after)?;
        }
        (None, Some(after)) => {
            println!(
                "sync: repository now has commits; showing latest commit ({})",
                short_hash(after)
            );
            git.show_commit(repo, after)?;
        }
        (_, None) => println!("sync: no commits found."),
    }

    Ok(())
}

fn show_check_diff(git: &GitCli, repo: &Path) -> Result<()> {
    println!("check: git status --short");
    let status = git.status_short(repo)?;
    if status.trim().is_empty() {
        println!("(no status lines)");
    } else {
        println!("{status}");
    }

    let has_head = git.head(repo)?.is_some();
    if has_head {
        println!("check: git diff HEAD");
    } else {
        println!("check: git diff");
    }
    git.show_worktree_diff(repo, has_head)?;

    Ok(())
}

fn short_hash(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}
