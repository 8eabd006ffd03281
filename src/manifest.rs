// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

//! Bootstrap manifest layout.
//!
//! Specify the layout for the manifest file that devstrap uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Bootstrap manifest layout.
///
/// The manifest is the single configuration file that drives a bootstrap
/// run. It is composed of four basic parts: settings, a tool catalog, a
/// link listing, and a plugin listing.
///
/// # General Layout
///
/// The settings section points devstrap at the dotfiles repository whose
/// files get symlinked into the user's home directory. The `[[tool]]`
/// tables form the catalog consumed by the installer loop. The `[[link]]`
/// tables name which repository files get symlinked where. The `[[plugin]]`
/// tables name shell-framework plugin repositories to clone.
///
/// When no manifest file exists on disk, [`Manifest::builtin`] provides the
/// default catalog and link listing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Settings for the bootstrap run.
    pub settings: ManifestSettings,

    /// Tool catalog consumed by the installer loop.
    #[serde(rename = "tool", default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolEntry>,

    /// Dotfile link listing.
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkEntry>,

    /// Shell-framework plugin listing.
    #[serde(rename = "plugin", default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginEntry>,
}

impl Manifest {
    /// Construct the built-in manifest.
    ///
    /// The built-in catalog covers the fixed set of command-line tools and
    /// dotfile links that a fresh machine gets bootstrapped with. Used as
    /// the fallback when no manifest file exists on disk. The dotfiles
    /// repository root must be supplied by the caller.
    pub fn builtin(repository: impl Into<PathBuf>) -> Self {
        let tool = |name: &str| ToolEntry {
            name: name.into(),
            bins: Vec::new(),
            package: None,
            script: None,
            version_args: Vec::new(),
        };

        let link = |source: &str, target: &str| LinkEntry {
            source: source.into(),
            target: target.into(),
        };

        Self {
            settings: ManifestSettings {
                description: "built-in bootstrap catalog".into(),
                repository: RepoRoot::new(repository),
                shell_utils: Some("shell-utils".into()),
            },
            tools: vec![
                tool("git"),
                tool("curl"),
                ToolEntry {
                    bins: vec!["rg".into()],
                    ..tool("ripgrep")
                },
                ToolEntry {
                    // Debian installs the binary as fdfind.
                    bins: vec!["fd".into(), "fdfind".into()],
                    package: Some(PackageNames {
                        brew: None,
                        apt: Some("fd-find".into()),
                    }),
                    ..tool("fd")
                },
                ToolEntry {
                    // Debian installs the binary as batcat.
                    bins: vec!["bat".into(), "batcat".into()],
                    ..tool("bat")
                },
                tool("fzf"),
                tool("tmux"),
                ToolEntry {
                    bins: vec!["nvim".into()],
                    ..tool("neovim")
                },
                tool("zsh"),
            ],
            links: vec![
                link("vim/vimrc", "~/.vimrc"),
                link("tmux/tmux.conf", "~/.tmux.conf"),
                link("zsh/zshrc", "~/.zshrc"),
                link("git/gitconfig", "~/.gitconfig"),
            ],
            plugins: Vec::new(),
        }
    }

    /// Apply shell expansion to all path-like fields.
    ///
    /// Parsing a manifest does this on its own; callers only need it for
    /// manifests constructed in code, like the built-in catalog.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::ShellExpansion`] if expansion fails.
    pub fn expand_paths(&mut self) -> Result<()> {
        self.settings.repository =
            RepoRoot::new(expand(self.settings.repository.to_string().as_str())?);
        for link in &mut self.links {
            link.target = expand(link.target.as_str())?;
        }
        for plugin in &mut self.plugins {
            plugin.target = PathBuf::from(expand(plugin.target.to_string_lossy().as_ref())?);
        }

        Ok(())
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut manifest: Manifest =
            toml::de::from_str(data).map_err(ManifestError::Deserialize)?;

        // INVARIANT: Perform shell expansion on all path-like fields.
        manifest.expand_paths()?;

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ManifestError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(data: &str) -> Result<String, ManifestError> {
    Ok(shellexpand::full(data)
        .map_err(ManifestError::ShellExpansion)?
        .into_owned())
}

/// Manifest configuration settings.
///
/// Standard settings to use for any given bootstrap run.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManifestSettings {
    /// Brief description of what the manifest bootstraps.
    pub description: String,

    /// Root of the dotfiles repository that link sources resolve against.
    pub repository: RepoRoot,

    /// Directory inside the repository holding shell snippet files to copy
    /// into `$XDG_CONFIG_HOME/shell-utils`.
    pub shell_utils: Option<PathBuf>,
}

/// One installable tool in the catalog.
///
/// A tool entry is a static descriptor consumed exactly once per run by the
/// installer loop: probe first, install only when the probe fails.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ToolEntry {
    /// Human-readable label, doubles as the default package and binary name.
    pub name: String,

    /// Ordered probe candidates. First spawnable candidate wins. Empty means
    /// probe the tool name itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<String>,

    /// Per-package-manager package-name overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageNames>,

    /// Bespoke install command. When set, the tool installs through the
    /// shell instead of the package manager (curl-pipe installers and the
    /// like).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Arguments for the informational version probe. Empty means
    /// `--version`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_args: Vec<String>,
}

impl ToolEntry {
    /// Ordered listing of binary names to probe for.
    pub fn probe_candidates(&self) -> Vec<&str> {
        if self.bins.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.bins.iter().map(String::as_str).collect()
        }
    }

    /// Arguments used for the informational version probe.
    pub fn version_args(&self) -> Vec<&str> {
        if self.version_args.is_empty() {
            vec!["--version"]
        } else {
            self.version_args.iter().map(String::as_str).collect()
        }
    }
}

/// Per-package-manager package-name overrides for a tool.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PackageNames {
    /// Homebrew formula name, when it differs from the tool name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brew: Option<String>,

    /// Apt package name, when it differs from the tool name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apt: Option<String>,
}

/// One dotfile symlink in the link listing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkEntry {
    /// Path of the link source, relative to the repository root.
    pub source: PathBuf,

    /// Path the symlink gets created at. Shell expanded on parse, so `~` and
    /// environment variables are fair game.
    pub target: String,
}

impl LinkEntry {
    /// Link target as a [`Path`] slice.
    pub fn target_path(&self) -> &Path {
        Path::new(self.target.as_str())
    }
}

/// One shell-framework plugin repository in the plugin listing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PluginEntry {
    /// Name of the plugin, doubles as the clone directory name.
    pub name: String,

    /// Remote URL to clone the plugin from.
    pub url: String,

    /// Directory the plugin gets cloned under. Shell expanded on parse.
    pub target: PathBuf,
}

/// Path acting as the dotfiles repository root.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RepoRoot(PathBuf);

impl RepoRoot {
    /// Construct new repository root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat repository root as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Resolve a link source against the repository root.
    pub fn resolve(&self, source: impl AsRef<Path>) -> PathBuf {
        self.0.join(source)
    }
}

impl Display for RepoRoot {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Manifest error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ManifestError {
    /// Failed to deserialize manifest.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize manifest.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on manifest.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ManifestError> for FmtError {
    fn from(_: ManifestError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("DOTS", "/home/blah/dotfiles")])]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = r#"
            [settings]
            description = "blah blah blah"
            repository = "$DOTS"
            shell_utils = "shell-utils"

            [[tool]]
            name = "bat"
            bins = ["bat", "batcat"]

            [[link]]
            source = "vim/vimrc"
            target = "$DOTS/../.vimrc"

            [[plugin]]
            name = "zsh-autosuggestions"
            url = "https://blah.org/zsh-autosuggestions.git"
            target = "$DOTS/plugins"
        "#
        .parse()?;

        let expect = Manifest {
            settings: ManifestSettings {
                description: "blah blah blah".into(),
                repository: RepoRoot::new("/home/blah/dotfiles"),
                shell_utils: Some("shell-utils".into()),
            },
            tools: vec![ToolEntry {
                name: "bat".into(),
                bins: vec!["bat".into(), "batcat".into()],
                package: None,
                script: None,
                version_args: Vec::new(),
            }],
            links: vec![LinkEntry {
                source: "vim/vimrc".into(),
                target: "/home/blah/dotfiles/../.vimrc".into(),
            }],
            plugins: vec![PluginEntry {
                name: "zsh-autosuggestions".into(),
                url: "https://blah.org/zsh-autosuggestions.git".into(),
                target: "/home/blah/dotfiles/plugins".into(),
            }],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_manifest() {
        let result = Manifest {
            settings: ManifestSettings {
                description: "blah blah blah".into(),
                repository: RepoRoot::new("/home/blah/dotfiles"),
                shell_utils: None,
            },
            tools: vec![ToolEntry {
                name: "fd".into(),
                bins: vec!["fd".into(), "fdfind".into()],
                package: Some(PackageNames {
                    brew: None,
                    apt: Some("fd-find".into()),
                }),
                script: None,
                version_args: Vec::new(),
            }],
            links: vec![LinkEntry {
                source: "vim/vimrc".into(),
                target: "/home/blah/.vimrc".into(),
            }],
            plugins: Vec::new(),
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            description = "blah blah blah"
            repository = "/home/blah/dotfiles"

            [[tool]]
            name = "fd"
            bins = [
                "fd",
                "fdfind",
            ]

            [tool.package]
            apt = "fd-find"

            [[link]]
            source = "vim/vimrc"
            target = "/home/blah/.vimrc"
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn tool_entry_probe_fallbacks() {
        let plain = ToolEntry {
            name: "fzf".into(),
            ..Default::default()
        };
        assert_eq!(plain.probe_candidates(), vec!["fzf"]);
        assert_eq!(plain.version_args(), vec!["--version"]);

        let fallback = ToolEntry {
            name: "bat".into(),
            bins: vec!["bat".into(), "batcat".into()],
            ..Default::default()
        };
        assert_eq!(fallback.probe_candidates(), vec!["bat", "batcat"]);
    }

    #[test]
    fn builtin_catalog_is_complete() {
        let manifest = Manifest::builtin("/home/blah/dotfiles");

        assert!(!manifest.tools.is_empty());
        assert!(!manifest.links.is_empty());
        for tool in &manifest.tools {
            assert!(!tool.probe_candidates().is_empty());
        }

        // Every link lands inside the home directory.
        for link in &manifest.links {
            assert!(link.target.starts_with("~/"));
        }
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn builtin_catalog_expands_paths() -> anyhow::Result<()> {
        let mut manifest = Manifest::builtin("/home/blah/dotfiles");
        manifest.expand_paths()?;

        for link in &manifest.links {
            assert!(link.target.starts_with("/home/blah/"));
        }

        Ok(())
    }
}
