//! cygmirror CLI - build a partial offline mirror of a Cygwin repository
//!
//! Usage:
//!   cygmirror build [LISTS...]       Build a mirror for the packages in LISTS
//!   cygmirror build --all            Mirror every package
//!   cygmirror categories             Show packages by category
//!   cygmirror deps <name>...         Show the resolved dependency closure

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cygmirror::config::{self, ConfigFile};
use cygmirror::{MirrorConfig, RunOutcome, UrlFetcher, categories, manifest, output, pkglist, resolver};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cygmirror")]
#[command(about = "Build a partial, offline-installable Cygwin mirror")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $XDG_CONFIG_HOME/cygmirror/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Mirror site base URL
    #[arg(short, long, global = true, env = "CYGMIRROR_MIRROR")]
    mirror: Option<String>,

    /// Read the manifest from this URL instead of <mirror>/setup.ini
    #[arg(short = 'i', long, global = true, env = "CYGMIRROR_MANIFEST_URL")]
    manifest_url: Option<String>,

    /// Comma-separated epochs to mirror (curr, prev, test)
    #[arg(short, long, global = true)]
    epochs: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a mirror
    Build {
        /// Package list files (one name per line, # comments)
        lists: Vec<PathBuf>,

        /// Target directory
        #[arg(short, long, env = "CYGMIRROR_DIR")]
        directory: Option<PathBuf>,

        /// Resolve and plan only, write nothing
        #[arg(short = 'z', long)]
        dry_run: bool,

        /// Installer URL
        #[arg(short = 'x', long, env = "CYGMIRROR_INSTALLER_URL")]
        installer_url: Option<String>,

        /// Mirror every package (overrides package lists)
        #[arg(short, long)]
        all: bool,
    },

    /// Show packages grouped by category
    Categories,

    /// Show the dependency closure of packages
    Deps {
        /// Package names
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    let failure = cli.command.failure_message();
    if let Err(e) = run(cli) {
        output::error(&format!("{}: {:#}", failure, e));
        std::process::exit(1);
    }
}

impl Commands {
    /// Prefix for the error summary when the command fails
    fn failure_message(&self) -> &'static str {
        match self {
            Commands::Build { .. } => "Failed to build mirror",
            Commands::Categories => "Failed to list categories",
            Commands::Deps { .. } => "Failed to resolve dependencies",
        }
    }
}

/// Layer the config file and global flags over the defaults.
fn base_config(cli: &Cli) -> Result<MirrorConfig> {
    let mut config = MirrorConfig::default();

    if let Some(file) = ConfigFile::load(cli.config.as_deref())? {
        config.apply_file(file);
    }
    if let Some(mirror) = &cli.mirror {
        config = config.with_mirror(mirror);
    }
    if let Some(url) = &cli.manifest_url {
        config.manifest_url = Some(url.clone());
    }
    if let Some(epochs) = &cli.epochs {
        config.epochs = config::parse_epochs(epochs)?;
    }

    output::debug(&format!("mirror: {}", config.mirror_url));
    output::debug(&format!("manifest: {}", config.manifest_url()));
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = base_config(&cli)?;
    let fetcher = UrlFetcher::default();

    match cli.command {
        Commands::Build {
            lists,
            directory,
            dry_run,
            installer_url,
            all,
        } => {
            if let Some(dir) = directory {
                config.target_dir = dir;
            }
            if let Some(url) = installer_url {
                config.installer_url = url;
            }
            config.dry_run = dry_run;
            config.include_all = all;
            if !lists.is_empty() {
                let names = pkglist::read_package_lists(&lists)
                    .context("Failed to read package lists")?;
                config.seeds = Some(names);
            }

            match cygmirror::run(&config, &fetcher)? {
                RunOutcome::DryRun { .. } => {
                    output::success("Dry run complete, nothing written");
                }
                RunOutcome::Built(report) => {
                    output::info(&format!(
                        "{} fetched, {} already present, {} downloaded",
                        report.fetched_count(),
                        report.present_count(),
                        output::format_size(report.fetched_bytes)
                    ));

                    let failed = report.failures().count();
                    if failed > 0 {
                        anyhow::bail!("{} of {} files failed verification or download", failed, report.files.len());
                    }
                    output::success(&format!("Mirror ready in {}", report.target_dir.display()));
                }
            }
        }

        Commands::Categories => {
            use owo_colors::OwoColorize;

            let index = manifest::fetch_index(&fetcher, &config.manifest_url())?;
            for (category, names) in categories::build_categories(&index) {
                if category == categories::ALL_CATEGORY {
                    continue;
                }
                println!("{} ({})", category.bold(), names.len());
                println!("  {}", names.join(" "));
            }
        }

        Commands::Deps { packages } => {
            use owo_colors::OwoColorize;

            let index = manifest::fetch_index(&fetcher, &config.manifest_url())?;
            let closure = resolver::resolve(&index, Some(packages.as_slice()), false, &config.epochs)?;
            output::info(&format!("{} packages required by {}:", closure.len(), packages.join(" ").bold()));
            for name in closure {
                if packages.contains(&name) {
                    println!("  {}", name.green());
                } else {
                    println!("  {}", name);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_per_subcommand() {
        let build = Cli::parse_from(["cygmirror", "build", "-z"]);
        assert_eq!(build.command.failure_message(), "Failed to build mirror");

        let cats = Cli::parse_from(["cygmirror", "categories"]);
        assert_eq!(cats.command.failure_message(), "Failed to list categories");

        let deps = Cli::parse_from(["cygmirror", "deps", "bash"]);
        assert_eq!(deps.command.failure_message(), "Failed to resolve dependencies");
    }
}
