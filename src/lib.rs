// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Bootstrap a personal development environment.
//!
//! Devstrap detects the host operating system, installs a table-driven
//! catalog of command-line tools through the platform's package manager
//! (Homebrew on macOS, apt on Linux and WSL), clones shell-framework
//! plugins, and symlinks a fixed set of dotfiles from a repository into the
//! user's home directory. A companion verification pass re-checks that the
//! expected binaries, symlinks, and configuration exist afterwards.
//!
//! Everything runs sequentially in one thread. Tool and plugin failures are
//! soft: they accumulate in per-run reports and never abort the batch. The
//! only hard failures are the platform preconditions checked up front.

pub mod install;
pub mod links;
pub mod manifest;
pub mod path;
pub mod platform;
pub mod plugins;
pub mod verify;

pub use install::{install_tools, Apt, Homebrew, Summary, ToolInstaller};
pub use links::{populate_shell_utils, LinkReport, Linker};
pub use manifest::{LinkEntry, Manifest, PluginEntry, ToolEntry};
pub use platform::{PackageManagerKind, Platform};
pub use plugins::{clone_all, PluginReport};
pub use verify::{verify, VerifyReport};
