//! Homestead CLI - Inspect and exercise a module host configuration.
//!
//! `homestead check` loads every configured module and prints what it
//! registered. `homestead probe` dispatches a single hook and prints the
//! aggregated verdict.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use homestead_config::HostConfig;
use homestead_telemetry::{LogConfig, LogFormat, setup_logging};

mod commands;
mod theme;

use commands::{check, probe};
use theme::Theme;

/// Homestead - Module host for homeserver spam checkers
#[derive(Parser)]
#[command(name = "homestead")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every configured module and report what it registered
    Check {
        /// Path to configuration file (.toml, .yaml or .yml)
        #[arg(short, long, env = "HOMESTEAD_CONFIG")]
        config: PathBuf,
    },

    /// Dispatch one hook category and print the verdict
    Probe {
        /// Path to configuration file (.toml, .yaml or .yml)
        #[arg(short, long, env = "HOMESTEAD_CONFIG")]
        config: PathBuf,

        #[command(flatten)]
        args: probe::ProbeArgs,
    },
}

impl Commands {
    fn config_path(&self) -> &Path {
        match self {
            Self::Check { config } | Self::Probe { config, .. } => config,
        }
    }
}

/// Install logging from the `[logging]` section, with `--verbose` forcing debug.
fn init_logging(config: Option<&HostConfig>, verbose: bool) {
    let log_config = match config.map(|c| LogConfig::try_from(&c.logging)) {
        Some(Ok(mut lc)) => {
            if verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Some(Err(e)) => {
            eprintln!("{}", Theme::warning(&format!("Ignoring [logging] section: {e}")));
            fallback_log_config(verbose)
        },
        None => fallback_log_config(verbose),
    };
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn fallback_log_config(verbose: bool) -> LogConfig {
    let level = if verbose { "debug" } else { "warn" };
    LogConfig::new(level).with_format(LogFormat::Compact)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.command.config_path().to_path_buf();
    let config = match HostConfig::load_file(&path) {
        Ok(config) => config,
        Err(e) => {
            init_logging(None, cli.verbose);
            eprintln!("{}", Theme::error(&format!("Invalid configuration: {e}")));
            return Err(e.into());
        },
    };
    init_logging(Some(&config), cli.verbose);

    match cli.command {
        Commands::Check { .. } => check::run_check(&path, &config, cli.verbose)?,
        Commands::Probe { args, .. } => probe::run_probe(&config, &args).await?,
    }

    Ok(())
}
