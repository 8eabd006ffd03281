// SPDX-FileCopyrightText: 2026 devstrap contributors
// SPDX-License-Identifier: MIT

use devstrap::{
    install::{install_tools, Apt, Homebrew},
    links::{populate_shell_utils, Linker},
    manifest::Manifest,
    path::{default_manifest_path, shell_utils_dir},
    platform::{PackageManagerKind, Platform},
    plugins::clone_all,
    verify::verify,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{fs::read_to_string, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  devstrap [options] install\n  devstrap [options] verify",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Skip all confirmation prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Install(opts) => run_install(opts, self.assume_yes),
            Command::Verify(opts) => run_verify(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    #[command(override_usage = "devstrap install [options]")]
    Install(InstallOptions),

    #[command(override_usage = "devstrap verify [options]")]
    Verify(VerifyOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct VerifyOptions {
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,
}

fn main() {
    let layer = fmt::layer().compact();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_install(opts: InstallOptions, assume_yes: bool) -> Result<()> {
    let platform = Platform::detect()?;
    let manager = platform.package_manager();
    manager.require()?;
    info!("bootstrapping {platform} through {manager}");

    let manifest = load_manifest(opts.manifest)?;
    if !assume_yes {
        let proceed = Confirm::new(&format!(
            "install {} tools and link {} dotfiles on {platform}?",
            manifest.tools.len(),
            manifest.links.len(),
        ))
        .with_default(true)
        .prompt()?;

        if !proceed {
            info!("nothing done");
            return Ok(());
        }
    }

    let summary = match manager {
        PackageManagerKind::Homebrew => install_tools(&Homebrew, &manifest.tools),
        PackageManagerKind::Apt => install_tools(&Apt, &manifest.tools),
    };

    let plugin_report = clone_all(&manifest.plugins);

    let linker = Linker::new(manifest.settings.repository.clone());
    let link_report = linker.link_all(&manifest.links)?;
    if let Some(snippet_dir) = &manifest.settings.shell_utils {
        populate_shell_utils(
            &manifest.settings.repository.resolve(snippet_dir),
            &shell_utils_dir()?,
        )?;
    }

    info!("{summary}");
    info!(
        "linked {} dotfiles ({} already in place)",
        link_report.linked.len(),
        link_report.kept.len()
    );
    for conflict in &link_report.conflicts {
        warn!("left {} alone, sort out its backup by hand", conflict.display());
    }
    if !plugin_report.failed.is_empty() {
        warn!("plugins failed to clone: {}", plugin_report.failed.join(", "));
    }
    if !summary.is_clean() {
        warn!("some tools failed to install: {}", summary.failed.join(", "));
    }

    // Partial tool failures are soft, the run still counts as completed.
    Ok(())
}

fn run_verify(opts: VerifyOptions) -> Result<()> {
    let manifest = load_manifest(opts.manifest)?;
    let report = verify(&manifest, &shell_utils_dir()?);
    println!("{report}");

    if !report.is_clean() {
        return Err(anyhow!("verification failed: {} checks failed", report.failed_count()));
    }

    Ok(())
}

fn load_manifest(path: Option<PathBuf>) -> Result<Manifest> {
    if let Some(path) = path {
        let data = read_to_string(&path)
            .with_context(|| format!("failed to read manifest at {}", path.display()))?;
        return Ok(data.parse()?);
    }

    let path = default_manifest_path()?;
    if path.is_file() {
        let data = read_to_string(&path)
            .with_context(|| format!("failed to read manifest at {}", path.display()))?;
        return Ok(data.parse()?);
    }

    // No manifest on disk means the built-in catalog, rooted at the current
    // directory, which is expected to be the dotfiles repository itself.
    info!("no manifest at {}, using built-in catalog", path.display());
    let repository = std::env::current_dir().context("cannot determine current directory")?;
    let mut manifest = Manifest::builtin(repository);
    manifest.expand_paths()?;

    Ok(manifest)
}
