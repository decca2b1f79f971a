//! Powerlist CLI entry point

use clap::Parser;
use powerlist::cli::build::{BuildOptions, run_build};
use powerlist::cli::{Cli, Command};
use powerlist::config::{Config, LogLevel};
use powerlist::output::HumanFormatter;
use std::path::Path;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Level from the configuration file, if it can be read at all
///
/// Errors are left for the command itself to report.
fn configured_level(path: Option<&Path>) -> Option<LogLevel> {
    let path = path?;
    Config::load(path).ok().map(|c| c.logging.level)
}

fn init_logging(cli: &Cli) {
    let config_path = match &cli.command {
        Command::Build { config, .. } => Some(config.as_path()),
        Command::Check { config, .. } | Command::Catalogue { config, .. } => config.as_deref(),
        Command::Init { .. } => None,
    };

    // RUST_LOG wins, then --log-level, then [logging] level
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = cli
            .log_level
            .map(LogLevel::from)
            .or_else(|| configured_level(config_path))
            .unwrap_or_default();
        EnvFilter::new(format!("powerlist={}", level.as_str()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    debug!(command = ?cli.command, "starting");

    let formatter = HumanFormatter::new(cli.color.into());
    let exit_code = match cli.command {
        Command::Build {
            config,
            no_sort,
            no_optimize,
            output,
            report,
        } => run_build(
            &BuildOptions {
                config,
                no_sort,
                no_optimize,
                output,
                report,
            },
            &formatter,
        ),
        Command::Check {
            files,
            format,
            config,
        } => powerlist::cli::check::run_check(&files, format, config.as_deref(), &formatter),
        Command::Init { force } => match powerlist::cli::init::run_init(force) {
            Ok(result) => {
                for file in &result.created {
                    println!("Created {}", file);
                }
                for file in &result.overwritten {
                    println!("Overwrote {}", file);
                }
                for file in &result.skipped {
                    println!("Skipped {} (already exists, use --force to overwrite)", file);
                }
                powerlist::cli::EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                powerlist::cli::EXIT_ERROR
            }
        },
        Command::Catalogue { config, format } => {
            powerlist::cli::catalogue::run_catalogue(config.as_deref(), format)
        }
    };

    process::exit(exit_code);
}
