// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the bootstrap manifest.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/devstrap/manifest.toml` as
/// the default absolute path for the manifest. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_manifest_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("devstrap").join("manifest.toml"))
        .ok_or(NoWayHome)
}

/// Determine absolute path to the shell-utils target directory.
///
/// Shell snippet files get copied here, and the user's shell sources them on
/// startup. Uses XDG Base Directory path `$XDG_CONFIG_HOME/shell-utils`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn shell_utils_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("shell-utils"))
        .ok_or(NoWayHome)
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
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
