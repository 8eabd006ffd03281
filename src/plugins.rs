// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Shell-framework plugin cloning.
//!
//! Utilities to clone the manifest's plugin listing. Each plugin entry names
//! a remote repository and a target directory; the plugin gets cloned to
//! `<target>/<name>` through libgit2 with a progress bar, prompting for
//! credentials when the remote demands them.
//!
//! Cloning is idempotent in the same soft way the installer loop is: a
//! plugin whose clone directory already exists is reported as present and
//! skipped, and a failed clone lands in the run's report without stopping
//! the batch.

use crate::manifest::PluginEntry;

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{path::Path, time};
use tracing::{info, instrument, warn};

/// Clone an entire plugin listing.
///
/// Entries are cloned in order. Failures are soft: the entry lands in the
/// report's failure listing and the loop keeps going.
#[instrument(skip(plugins), level = "debug")]
pub fn clone_all(plugins: &[PluginEntry]) -> PluginReport {
    let mut report = PluginReport::default();

    for entry in plugins {
        match clone_plugin(entry) {
            Ok(PluginOutcome::Cloned) => report.cloned.push(entry.name.clone()),
            Ok(PluginOutcome::AlreadyCloned) => report.kept.push(entry.name.clone()),
            Err(error) => {
                warn!("failed to clone plugin {}: {error}", entry.name);
                report.failed.push(entry.name.clone());
            }
        }
    }

    report
}

/// Clone one plugin entry to `<target>/<name>`.
///
/// The progress of the clone is displayed through a progress bar. If any
/// credentials are required for the clone to continue, then the user will be
/// prompted for that information accordingly. The progress bar will be
/// blocked for user input.
///
/// # Errors
///
/// - Return [`PluginError::Git2`] if libgit2 operations fail.
/// - Return [`PluginError::IndicatifStyleTemplate`] if the progress bar
///   style cannot be set.
pub fn clone_plugin(entry: &PluginEntry) -> Result<PluginOutcome> {
    let clone_dir = entry.target.join(&entry.name);
    if clone_dir.exists() {
        info!("plugin {} already cloned at {}", entry.name, clone_dir.display());
        return Ok(PluginOutcome::AlreadyCloned);
    }

    info!("clone plugin {} from {}", entry.name, entry.url);
    clone_with_progress(&entry.url, &clone_dir, ProgressBar::no_length())?;

    Ok(PluginOutcome::Cloned)
}

fn clone_with_progress(url: &str, path: &Path, bar: ProgressBar) -> Result<()> {
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(url.to_string());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let prompter = ClonePrompter::new(bar);
    let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
    let config = Config::open_default()?;

    let mut throttle = time::Instant::now();
    let mut rc = RemoteCallbacks::new();
    rc.credentials(authenticator.credentials(&config));
    rc.transfer_progress(|progress| {
        let stats = progress.to_owned();
        let bar_size = stats.total_objects() as u64;
        let bar_pos = stats.received_objects() as u64;
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            prompter.bar.set_length(bar_size);
            prompter.bar.set_position(bar_pos);
        }
        true
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(rc);
    RepoBuilder::new().fetch_options(fo).clone(url, path)?;
    prompter.bar.finish_and_clear();

    Ok(())
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
struct ClonePrompter {
    bar: ProgressBar,
}

impl ClonePrompter {
    /// Construct new progress bar authenticator.
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for ClonePrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| -> Option<String> {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| -> Option<String> {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

/// Outcome of cloning one plugin entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOutcome {
    /// Plugin was cloned this run.
    Cloned,

    /// Clone directory already exists.
    AlreadyCloned,
}

/// Outcome accumulator for one plugin clone run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PluginReport {
    /// Plugins cloned this run.
    pub cloned: Vec<String>,

    /// Plugins whose clone directory already existed.
    pub kept: Vec<String>,

    /// Plugins whose clone failed.
    pub failed: Vec<String>,
}

impl PluginReport {
    /// Check that no clone failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plugin cloning error types.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
type Result<T, E = PluginError> = std::result::Result<T, E>;
