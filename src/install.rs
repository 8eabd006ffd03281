// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Idempotent tool installation.
//!
//! The installer loop walks the manifest's tool catalog exactly once per
//! run. Each entry is probed first: a tool whose binary already spawns is
//! reported as present together with whatever version string it offers, and
//! is never reinstalled. Only entries that fail the probe get handed to the
//! platform's package manager.
//!
//! # Soft Failures
//!
//! Installation failures never abort the batch. A failed entry lands in the
//! run's [`Summary`] and the loop proceeds to the next descriptor. The only
//! hard failures in devstrap are the platform preconditions checked before
//! this loop ever starts.

use crate::{
    manifest::ToolEntry,
    platform::PackageManagerKind,
};

use std::{
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    process::Command,
};
use tracing::{debug, info, instrument, warn};

/// Layer of indirection for package installation.
pub trait ToolInstaller {
    /// Package manager this installer drives.
    fn kind(&self) -> PackageManagerKind;

    /// Install one package.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError::Syscall`] if the package manager invocation
    ///   fails.
    fn install(&self, package: &str) -> Result<()>;
}

/// Tool installation through Homebrew.
#[derive(Debug, Default)]
pub struct Homebrew;

impl ToolInstaller for Homebrew {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Homebrew
    }

    #[instrument(skip(self), level = "debug")]
    fn install(&self, package: &str) -> Result<()> {
        let output = syscall_non_interactive("brew", ["install", package])?;
        info!("{output}");

        Ok(())
    }
}

/// Tool installation through apt.
///
/// Package installation needs root, so the invocation goes through sudo,
/// which may prompt for a password on its own.
#[derive(Debug, Default)]
pub struct Apt;

impl ToolInstaller for Apt {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Apt
    }

    #[instrument(skip(self), level = "debug")]
    fn install(&self, package: &str) -> Result<()> {
        syscall_interactive("sudo", ["apt-get", "install", "-y", package])
    }
}

/// Probe one catalog entry for an already-installed binary.
///
/// Tries each probe candidate in order, spawning it with the entry's version
/// arguments. The first candidate that spawns at all wins; the version probe
/// is informational only, so a binary that spawns but rejects the version
/// flag still counts as present.
pub fn probe(entry: &ToolEntry) -> Option<String> {
    for bin in entry.probe_candidates() {
        debug!("probe {bin} for tool {}", entry.name);
        let output = match Command::new(bin).args(entry.version_args()).output() {
            Ok(output) => output,
            Err(_) => continue,
        };

        let stdout = String::from_utf8_lossy(output.stdout.as_slice());
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        let version = stdout
            .lines()
            .chain(stderr.lines())
            .next()
            .unwrap_or("version unknown")
            .to_string();

        return Some(version);
    }

    None
}

/// Run the idempotent installer loop over a tool catalog.
///
/// For each descriptor: probe, report "already installed" with version on
/// success, otherwise invoke the install directive. Failures are appended to
/// the summary and the loop keeps going. This function never errors; the
/// caller decides what the summary means for the exit code.
#[instrument(skip(installer, tools), level = "debug")]
pub fn install_tools(installer: &impl ToolInstaller, tools: &[ToolEntry]) -> Summary {
    let mut summary = Summary::default();

    for entry in tools {
        if let Some(version) = probe(entry) {
            info!("{} already installed ({version})", entry.name);
            summary.present.push((entry.name.clone(), version));
            continue;
        }

        let result = match &entry.script {
            Some(script) => {
                info!("install {} via install script", entry.name);
                run_install_script(script)
            }
            None => {
                info!("install {} via {}", entry.name, installer.kind());
                installer.install(package_for(entry, installer.kind()))
            }
        };

        match result {
            Ok(()) => summary.installed.push(entry.name.clone()),
            Err(error) => {
                warn!("failed to install {}: {error}", entry.name);
                summary.failed.push(entry.name.clone());
            }
        }
    }

    summary
}

/// Run a bespoke install script through the shell.
///
/// The script runs interactively so curl-pipe installers can talk to the
/// terminal.
fn run_install_script(script: &str) -> Result<()> {
    syscall_interactive("sh", ["-c", script])
}

/// Resolve the package name of a catalog entry for a package manager.
fn package_for(entry: &ToolEntry, kind: PackageManagerKind) -> &str {
    let name = entry.package.as_ref().and_then(|package| match kind {
        PackageManagerKind::Homebrew => package.brew.as_deref(),
        PackageManagerKind::Apt => package.apt.as_deref(),
    });

    name.unwrap_or(entry.name.as_str())
}

/// Outcome accumulator for one installer run.
///
/// Append-only from the single thread of control, drained into the final
/// report once the loop finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Tools that passed the probe, with their reported versions.
    pub present: Vec<(String, String)>,

    /// Tools that were freshly installed this run.
    pub installed: Vec<String>,

    /// Tools whose install directive reported failure.
    pub failed: Vec<String>,
}

impl Summary {
    /// Check that no install directive failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Check if a tool landed in the failure listing.
    pub fn failed_for(&self, name: impl AsRef<str>) -> bool {
        self.failed.iter().any(|failed| failed == name.as_ref())
    }
}

impl Display for Summary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for (name, version) in &self.present {
            writeln!(fmt, "found     {name} ({version})")?;
        }
        for name in &self.installed {
            writeln!(fmt, "installed {name}")?;
        }
        for name in &self.failed {
            writeln!(fmt, "FAILED    {name}")?;
        }

        write!(
            fmt,
            "{} found, {} installed, {} failed",
            self.present.len(),
            self.installed.len(),
            self.failed.len()
        )
    }
}

pub(crate) fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref()).args(args).spawn()?.wait()?;
    if !status.success() {
        return Err(InstallError::Syscall(std::io::Error::other(format!(
            "command {:?} failed",
            cmd.as_ref()
        ))));
    }

    Ok(())
}

pub(crate) fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(stdout.as_str());
    }

    if !stderr.is_empty() {
        message.push_str(stderr.as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(InstallError::Syscall(std::io::Error::other(format!(
            "command {:?} failed:\n{message}",
            cmd.as_ref()
        ))));
    }

    Ok(message)
}

/// Tool installation error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// External command invocation fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
type Result<T, E = InstallError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{PackageNames, ToolEntry};
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{cell::RefCell, path::Path};

    struct FakeInstaller {
        record: RefCell<Vec<String>>,
        broken: Vec<String>,
    }

    impl FakeInstaller {
        fn new(broken: impl IntoIterator<Item = impl Into<String>>) -> Self {
            Self {
                record: RefCell::new(Vec::new()),
                broken: broken.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl ToolInstaller for FakeInstaller {
        fn kind(&self) -> PackageManagerKind {
            PackageManagerKind::Apt
        }

        fn install(&self, package: &str) -> Result<()> {
            self.record.borrow_mut().push(package.to_string());
            if self.broken.iter().any(|broken| broken == package) {
                return Err(InstallError::Syscall(std::io::Error::other(
                    "package manager said no",
                )));
            }

            Ok(())
        }
    }

    fn tool(name: &str, bins: &[&str]) -> ToolEntry {
        ToolEntry {
            name: name.into(),
            bins: bins.iter().map(ToString::to_string).collect(),
            package: None,
            script: None,
            version_args: Vec::new(),
        }
    }

    #[test]
    fn probe_reports_present_binary() {
        // Spawning the shell works everywhere these tests run.
        let entry = tool("shell", &["sh"]);
        assert!(probe(&entry).is_some());
    }

    #[test]
    fn probe_walks_fallback_candidates() {
        let entry = tool("shell", &["devstrap-test-no-such-bin", "sh"]);
        assert!(probe(&entry).is_some());
    }

    #[test]
    fn probe_rejects_missing_binary() {
        let entry = tool("ghost", &["devstrap-test-no-such-bin"]);
        assert_eq!(probe(&entry), None);
    }

    #[test]
    fn installer_loop_soft_fails_and_continues() {
        let installer = FakeInstaller::new(["broken-tool"]);
        let tools = vec![
            tool("shell", &["sh"]),
            tool("broken-tool", &["devstrap-test-no-such-bin"]),
            tool("fresh-tool", &["devstrap-test-no-such-bin"]),
        ];

        let summary = install_tools(&installer, &tools);

        // Probe hit skips installation; failure does not stop the batch.
        assert_eq!(
            *installer.record.borrow(),
            vec!["broken-tool".to_string(), "fresh-tool".to_string()]
        );
        assert_eq!(summary.present.len(), 1);
        assert_eq!(summary.installed, vec!["fresh-tool".to_string()]);
        assert_eq!(summary.failed, vec!["broken-tool".to_string()]);
        assert!(!summary.is_clean());
        assert!(summary.failed_for("broken-tool"));
    }

    #[sealed_test]
    fn installer_loop_runs_bespoke_install_scripts() {
        let installer = FakeInstaller::new(Vec::<String>::new());
        let mut scripted = tool("scripted", &["devstrap-test-no-such-bin"]);
        scripted.script = Some("touch marker".into());
        let mut broken = tool("broken-script", &["devstrap-test-no-such-bin"]);
        broken.script = Some("exit 1".into());

        let summary = install_tools(&installer, &[scripted, broken]);

        // Scripts bypass the package manager entirely.
        assert!(installer.record.borrow().is_empty());
        assert!(Path::new("marker").is_file());
        assert_eq!(summary.installed, vec!["scripted".to_string()]);
        assert_eq!(summary.failed, vec!["broken-script".to_string()]);
    }

    #[test]
    fn package_name_resolution_prefers_override() {
        let mut entry = tool("fd", &["fd", "fdfind"]);
        assert_eq!(package_for(&entry, PackageManagerKind::Apt), "fd");

        entry.package = Some(PackageNames {
            brew: None,
            apt: Some("fd-find".into()),
        });
        assert_eq!(package_for(&entry, PackageManagerKind::Apt), "fd-find");
        assert_eq!(package_for(&entry, PackageManagerKind::Homebrew), "fd");
    }

    #[test]
    fn summary_report_format() {
        let summary = Summary {
            present: vec![("git".into(), "git version 2.49.0".into())],
            installed: vec!["ripgrep".into()],
            failed: vec!["fzf".into()],
        };

        let report = summary.to_string();
        assert!(report.contains("found     git (git version 2.49.0)"));
        assert!(report.contains("installed ripgrep"));
        assert!(report.contains("FAILED    fzf"));
        assert!(report.ends_with("1 found, 1 installed, 1 failed"));
    }
}
