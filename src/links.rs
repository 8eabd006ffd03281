// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Dotfile symlink deployment.
//!
//! Utilities to deploy the manifest's link listing into the user's home
//! directory. Each link entry names a source file inside the dotfiles
//! repository, and a target path the symlink gets created at.
//!
//! # Backup Policy
//!
//! A target that already exists as a regular file gets renamed once to
//! `<target>.backup` before the symlink is created. The backup rename only
//! ever happens on the first run: a second run finds the correct symlink in
//! place and does nothing, so no duplicate backups pile up. If both the
//! target and its backup exist, neither file is touched; the entry is
//! reported as a conflict and left for the user to sort out.
//!
//! # Shell Utils
//!
//! Besides symlinks, a bootstrap run populates `$XDG_CONFIG_HOME/shell-utils`
//! with snippet files copied from the repository. These are owned by
//! devstrap, so existing copies are overwritten without backups.

use crate::manifest::{LinkEntry, RepoRoot};

use std::{
    fs::{copy, read_dir, read_link, remove_file, rename, symlink_metadata},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

#[cfg(unix)]
use std::os::unix::fs::symlink;
#[cfg(windows)]
use std::os::windows::fs::symlink_file as symlink;

/// Dotfile symlink deployer.
///
/// Resolves link sources against the dotfiles repository root, and deploys
/// each entry of the link listing idempotently.
#[derive(Debug, Clone)]
pub struct Linker {
    repository: RepoRoot,
}

impl Linker {
    /// Construct new linker over a dotfiles repository root.
    pub fn new(repository: RepoRoot) -> Self {
        Self { repository }
    }

    /// Deploy an entire link listing.
    ///
    /// Entries are deployed in order. Backup conflicts are soft: the entry
    /// lands in the report's conflict listing and the loop keeps going.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError`] if filesystem manipulation fails.
    #[instrument(skip(self, links), level = "debug")]
    pub fn link_all(&self, links: &[LinkEntry]) -> Result<LinkReport> {
        let mut report = LinkReport::default();

        for entry in links {
            let target = entry.target_path().to_path_buf();
            match self.link_entry(entry)? {
                LinkOutcome::Linked => report.linked.push(target),
                LinkOutcome::AlreadyLinked => report.kept.push(target),
                LinkOutcome::BackupConflict => report.conflicts.push(target),
            }
        }

        Ok(report)
    }

    /// Deploy one link entry.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError`] if filesystem manipulation fails.
    pub fn link_entry(&self, entry: &LinkEntry) -> Result<LinkOutcome> {
        let source = self.repository.resolve(&entry.source);
        let target = entry.target_path();

        if let Ok(dest) = read_link(target) {
            if dest == source {
                info!("{} already linked", target.display());
                return Ok(LinkOutcome::AlreadyLinked);
            }

            // Stale symlink from an older layout. Safe to replace, the
            // repository still owns the real content.
            warn!(
                "replacing stale symlink {} -> {}",
                target.display(),
                dest.display()
            );
            remove_file(target).map_err(|err| LinkError::RemoveStaleLink {
                source: err,
                target: target.to_path_buf(),
            })?;
        } else if symlink_metadata(target).is_ok() {
            let backup = backup_path(target);
            if backup.exists() {
                warn!(
                    "both {} and {} exist, leaving them alone",
                    target.display(),
                    backup.display()
                );
                return Ok(LinkOutcome::BackupConflict);
            }

            info!("backing up {} to {}", target.display(), backup.display());
            rename(target, &backup).map_err(|err| LinkError::BackupRename {
                source: err,
                target: target.to_path_buf(),
            })?;
        }

        if let Some(parent) = target.parent() {
            mkdirp::mkdirp(parent).map_err(|err| LinkError::CreateParentDir {
                source: err,
                target: parent.to_path_buf(),
            })?;
        }

        debug!("symlink {} -> {}", target.display(), source.display());
        symlink(&source, target).map_err(|err| LinkError::CreateSymlink {
            source: err,
            target: target.to_path_buf(),
        })?;
        info!("linked {} -> {}", target.display(), source.display());

        Ok(LinkOutcome::Linked)
    }
}

/// Copy shell snippet files into the shell-utils directory.
///
/// Creates the target directory when missing. Only regular files at the
/// top level of the snippet directory are copied; existing copies are
/// overwritten. Returns the file names that were copied.
///
/// # Errors
///
/// - Return [`LinkError`] if filesystem manipulation fails.
#[instrument(level = "debug")]
pub fn populate_shell_utils(snippet_dir: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
    if !snippet_dir.is_dir() {
        warn!("snippet directory {} missing, nothing to copy", snippet_dir.display());
        return Ok(Vec::new());
    }

    mkdirp::mkdirp(target_dir).map_err(|err| LinkError::CreateParentDir {
        source: err,
        target: target_dir.to_path_buf(),
    })?;

    let entries = read_dir(snippet_dir).map_err(|err| LinkError::ReadSnippetDir {
        source: err,
        target: snippet_dir.to_path_buf(),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| LinkError::ReadSnippetDir {
            source: err,
            target: snippet_dir.to_path_buf(),
        })?;

        if !entry.path().is_file() {
            continue;
        }

        let destination = target_dir.join(entry.file_name());
        copy(entry.path(), &destination).map_err(|err| LinkError::CopySnippet {
            source: err,
            target: destination.clone(),
        })?;
        debug!("copied snippet {}", destination.display());
        copied.push(PathBuf::from(entry.file_name()));
    }

    info!("populated {} with {} snippets", target_dir.display(), copied.len());
    copied.sort();

    Ok(copied)
}

/// Compute the backup path of a link target.
fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Outcome of deploying one link entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Symlink was created this run.
    Linked,

    /// Correct symlink was already in place.
    AlreadyLinked,

    /// Target and its backup both exist; nothing was touched.
    BackupConflict,
}

/// Outcome accumulator for one link deployment run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Targets linked this run.
    pub linked: Vec<PathBuf>,

    /// Targets that were already linked correctly.
    pub kept: Vec<PathBuf>,

    /// Targets skipped because of a backup conflict.
    pub conflicts: Vec<PathBuf>,
}

impl LinkReport {
    /// Check that no entry was skipped over a backup conflict.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Link deployment error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Parent directory of a link target cannot be created.
    #[error("failed to create directory at {:?}", target.display())]
    CreateParentDir {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Pre-existing target file cannot be renamed to its backup.
    #[error("failed to back up {:?}", target.display())]
    BackupRename {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Stale symlink cannot be removed.
    #[error("failed to remove stale symlink at {:?}", target.display())]
    RemoveStaleLink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Symlink cannot be created.
    #[error("failed to create symlink at {:?}", target.display())]
    CreateSymlink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Snippet directory cannot be read.
    #[error("failed to read snippet directory {:?}", target.display())]
    ReadSnippetDir {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Snippet file cannot be copied.
    #[error("failed to copy snippet to {:?}", target.display())]
    CopySnippet {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::LinkEntry;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{create_dir_all, read_to_string, write};

    fn fixture() -> anyhow::Result<(Linker, LinkEntry)> {
        let cwd = std::env::current_dir()?;
        create_dir_all(cwd.join("dotfiles/vim"))?;
        write(cwd.join("dotfiles/vim/vimrc"), "set number\n")?;

        let linker = Linker::new(RepoRoot::new(cwd.join("dotfiles")));
        let entry = LinkEntry {
            source: "vim/vimrc".into(),
            target: cwd.join("home/.vimrc").to_string_lossy().into_owned(),
        };

        Ok((linker, entry))
    }

    #[sealed_test]
    fn link_entry_creates_symlink_into_repository() -> anyhow::Result<()> {
        let (linker, entry) = fixture()?;

        let outcome = linker.link_entry(&entry)?;

        assert_eq!(outcome, LinkOutcome::Linked);
        let dest = read_link(entry.target_path())?;
        assert!(dest.starts_with(linker.repository.as_path()));
        assert_eq!(read_to_string(entry.target_path())?, "set number\n");

        Ok(())
    }

    #[sealed_test]
    fn link_entry_backs_up_existing_file_once() -> anyhow::Result<()> {
        let (linker, entry) = fixture()?;
        create_dir_all(entry.target_path().parent().unwrap())?;
        write(entry.target_path(), "old settings\n")?;

        let outcome = linker.link_entry(&entry)?;

        assert_eq!(outcome, LinkOutcome::Linked);
        let backup = backup_path(entry.target_path());
        assert_eq!(read_to_string(&backup)?, "old settings\n");

        // Second run finds the correct symlink and leaves the backup alone.
        let outcome = linker.link_entry(&entry)?;
        assert_eq!(outcome, LinkOutcome::AlreadyLinked);
        assert_eq!(read_to_string(&backup)?, "old settings\n");

        Ok(())
    }

    #[sealed_test]
    fn link_entry_reports_backup_conflict() -> anyhow::Result<()> {
        let (linker, entry) = fixture()?;
        create_dir_all(entry.target_path().parent().unwrap())?;
        write(entry.target_path(), "current\n")?;
        write(backup_path(entry.target_path()), "older\n")?;

        let outcome = linker.link_entry(&entry)?;

        // Neither file gets touched.
        assert_eq!(outcome, LinkOutcome::BackupConflict);
        assert_eq!(read_to_string(entry.target_path())?, "current\n");
        assert_eq!(read_to_string(backup_path(entry.target_path()))?, "older\n");

        Ok(())
    }

    #[sealed_test]
    fn link_entry_replaces_stale_symlink() -> anyhow::Result<()> {
        let (linker, entry) = fixture()?;
        let cwd = std::env::current_dir()?;
        write(cwd.join("elsewhere"), "stale\n")?;
        create_dir_all(entry.target_path().parent().unwrap())?;
        symlink(cwd.join("elsewhere"), entry.target_path())?;

        let outcome = linker.link_entry(&entry)?;

        assert_eq!(outcome, LinkOutcome::Linked);
        let dest = read_link(entry.target_path())?;
        assert!(dest.starts_with(linker.repository.as_path()));

        Ok(())
    }

    #[sealed_test]
    fn link_all_accumulates_outcomes() -> anyhow::Result<()> {
        let (linker, entry) = fixture()?;
        let cwd = std::env::current_dir()?;
        write(cwd.join("dotfiles/gitconfig"), "[user]\n")?;
        let second = LinkEntry {
            source: "gitconfig".into(),
            target: cwd.join("home/.gitconfig").to_string_lossy().into_owned(),
        };
        linker.link_entry(&entry)?;

        let report = linker.link_all(&[entry.clone(), second.clone()])?;

        assert_eq!(report.kept, vec![entry.target_path().to_path_buf()]);
        assert_eq!(report.linked, vec![second.target_path().to_path_buf()]);
        assert!(report.is_clean());

        Ok(())
    }

    #[sealed_test]
    fn populate_shell_utils_copies_snippets() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        create_dir_all(cwd.join("dotfiles/shell-utils"))?;
        write(cwd.join("dotfiles/shell-utils/aliases.sh"), "alias g=git\n")?;
        write(cwd.join("dotfiles/shell-utils/prompt.sh"), "PS1='$ '\n")?;

        let target = cwd.join("config/shell-utils");
        let copied = populate_shell_utils(&cwd.join("dotfiles/shell-utils"), &target)?;

        assert_eq!(copied, vec![PathBuf::from("aliases.sh"), PathBuf::from("prompt.sh")]);
        assert_eq!(read_to_string(target.join("aliases.sh"))?, "alias g=git\n");

        // Re-population overwrites without complaint.
        write(cwd.join("dotfiles/shell-utils/aliases.sh"), "alias g=grep\n")?;
        populate_shell_utils(&cwd.join("dotfiles/shell-utils"), &target)?;
        assert_eq!(read_to_string(target.join("aliases.sh"))?, "alias g=grep\n");

        Ok(())
    }

    #[sealed_test]
    fn populate_shell_utils_tolerates_missing_snippet_dir() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let copied = populate_shell_utils(&cwd.join("nope"), &cwd.join("config/shell-utils"))?;
        assert!(copied.is_empty());

        Ok(())
    }
}
