// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Host platform detection.
//!
//! Determine what operating system devstrap is bootstrapping, and which
//! package manager that platform gets its command-line tools from.
//!
//! # Supported Platforms
//!
//! Devstrap supports macOS, Linux, and Linux under WSL. Everything else is a
//! fatal precondition failure: the run aborts before the installer loop
//! starts. WSL is told apart from plain Linux by the kernel version string
//! in `/proc/version`, which Microsoft brands with "microsoft". WSL still
//! bootstraps through apt, so the distinction only matters for reporting.
//!
//! # Package Managers
//!
//! macOS installs through Homebrew, Linux and WSL through apt. The chosen
//! package manager must already be on the system; devstrap never installs
//! a package manager itself. A missing package manager is the second fatal
//! precondition.

use std::{fmt::{Display, Formatter, Result as FmtResult}, fs::read_to_string, process::Command};
use tracing::debug;

/// Host operating system flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Plain macOS.
    MacOs,

    /// Plain Linux.
    Linux,

    /// Linux under Windows Subsystem for Linux.
    Wsl,
}

impl Platform {
    /// Detect the host platform.
    ///
    /// # Errors
    ///
    /// - Return [`PlatformError::Unsupported`] on any host that is neither
    ///   macOS nor Linux.
    pub fn detect() -> Result<Self> {
        match std::env::consts::OS {
            "macos" => Ok(Self::MacOs),
            "linux" => {
                // WSL brands the kernel version string.
                let version = read_to_string("/proc/version").unwrap_or_default();
                if is_wsl_kernel(&version) {
                    Ok(Self::Wsl)
                } else {
                    Ok(Self::Linux)
                }
            }
            other => Err(PlatformError::Unsupported {
                os: other.to_string(),
            }),
        }
    }

    /// Package manager this platform installs tools through.
    pub fn package_manager(&self) -> PackageManagerKind {
        match self {
            Self::MacOs => PackageManagerKind::Homebrew,
            Self::Linux | Self::Wsl => PackageManagerKind::Apt,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Wsl => "Linux (WSL)",
        };
        fmt.write_str(name)
    }
}

/// Kind of package manager a platform installs tools through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerKind {
    Homebrew,
    Apt,
}

impl PackageManagerKind {
    /// Name of the package manager binary.
    pub fn bin(&self) -> &'static str {
        match self {
            Self::Homebrew => "brew",
            Self::Apt => "apt-get",
        }
    }

    /// Check that the package manager binary is actually usable.
    ///
    /// # Errors
    ///
    /// - Return [`PlatformError::PackageManagerMissing`] if the binary
    ///   cannot be spawned.
    pub fn require(&self) -> Result<()> {
        debug!("probe package manager binary: {}", self.bin());
        Command::new(self.bin())
            .arg("--version")
            .output()
            .map_err(|_| PlatformError::PackageManagerMissing { bin: self.bin() })?;

        Ok(())
    }
}

impl Display for PackageManagerKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.bin())
    }
}

/// Check if a kernel version string belongs to WSL.
fn is_wsl_kernel(version: &str) -> bool {
    version.to_lowercase().contains("microsoft")
}

/// Platform precondition error types.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Host operating system is not supported.
    #[error("unsupported operating system: {os}")]
    Unsupported { os: String },

    /// Platform's package manager is not installed.
    #[error("package manager {bin:?} not found on PATH")]
    PackageManagerMissing { bin: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = PlatformError> = std::result::Result<T, E>;
