// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Post-bootstrap verification.
//!
//! Companion to the installer: re-checks that everything a bootstrap run
//! promised actually exists. Verification walks the same manifest the
//! installer consumed and asserts that:
//!
//! 1. Every catalog tool answers its probe on PATH.
//! 2. Every link target exists, is a symlink, and resolves into the
//!    dotfiles repository.
//! 3. Every plugin clone directory exists.
//! 4. The shell-utils directory holds every snippet file the repository
//!    provides.
//!
//! Each assertion becomes one [`Check`] in the report. Verification never
//! aborts early; the caller turns a dirty report into exit code 1.

use crate::{install::probe, manifest::Manifest};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_dir, read_link},
    path::Path,
};
use tracing::{debug, instrument};

/// Verify a manifest against the live filesystem.
#[instrument(skip(manifest), level = "debug")]
pub fn verify(manifest: &Manifest, shell_utils_target: &Path) -> VerifyReport {
    let mut report = VerifyReport::default();

    for entry in &manifest.tools {
        debug!("verify tool {}", entry.name);
        match probe(entry) {
            Some(version) => report.pass(format!("tool {}", entry.name), version),
            None => report.fail(
                format!("tool {}", entry.name),
                "no probe candidate answered on PATH",
            ),
        }
    }

    let repository = manifest.settings.repository.as_path();
    for entry in &manifest.links {
        let target = entry.target_path();
        debug!("verify link {}", target.display());
        let name = format!("link {}", target.display());

        match read_link(target) {
            Ok(dest) if !dest.starts_with(repository) => {
                report.fail(name, format!("points outside repository: {}", dest.display()));
            }
            Ok(dest) if !dest.exists() => {
                report.fail(name, format!("dangling symlink to {}", dest.display()));
            }
            Ok(dest) => report.pass(name, format!("-> {}", dest.display())),
            Err(_) => report.fail(name, "not a symlink"),
        }
    }

    for entry in &manifest.plugins {
        let clone_dir = entry.target.join(&entry.name);
        debug!("verify plugin {}", entry.name);
        let name = format!("plugin {}", entry.name);

        if clone_dir.is_dir() {
            report.pass(name, format!("at {}", clone_dir.display()));
        } else {
            report.fail(name, format!("missing clone at {}", clone_dir.display()));
        }
    }

    if let Some(snippet_dir) = &manifest.settings.shell_utils {
        verify_shell_utils(
            &manifest.settings.repository.resolve(snippet_dir),
            shell_utils_target,
            &mut report,
        );
    }

    report
}

fn verify_shell_utils(snippet_dir: &Path, target_dir: &Path, report: &mut VerifyReport) {
    let Ok(entries) = read_dir(snippet_dir) else {
        // Nothing promised, nothing to verify.
        return;
    };

    for entry in entries.flatten() {
        if !entry.path().is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let copied = target_dir.join(&file_name);
        let name = format!("shell-utils {}", file_name.to_string_lossy());

        if copied.is_file() {
            report.pass(name, format!("at {}", copied.display()));
        } else {
            report.fail(name, format!("missing copy at {}", copied.display()));
        }
    }
}

/// One verification assertion and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// What got checked.
    pub name: String,

    /// Did the check pass?
    pub passed: bool,

    /// Version string, link destination, or failure reason.
    pub detail: String,
}

/// Outcome accumulator for one verification run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// All checks in manifest order.
    pub checks: Vec<Check>,
}

impl VerifyReport {
    /// Check that every assertion passed.
    pub fn is_clean(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Count of failed checks.
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|check| !check.passed).count()
    }

    fn pass(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        });
    }

    fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        });
    }
}

impl Display for VerifyReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for check in &self.checks {
            let mark = if check.passed { "ok  " } else { "FAIL" };
            writeln!(fmt, "{mark}  {} ({})", check.name, check.detail)?;
        }

        write!(
            fmt,
            "{} checks, {} failed",
            self.checks.len(),
            self.failed_count()
        )
    }
}
