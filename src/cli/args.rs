//! CLI argument parsing using clap

use crate::config::LogLevel;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for powerlist commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Automatically detect if terminal supports color
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}

impl From<ColorChoice> for termcolor::ColorChoice {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Auto => termcolor::ColorChoice::Auto,
            ColorChoice::Always => termcolor::ColorChoice::Always,
            ColorChoice::Never => termcolor::ColorChoice::Never,
        }
    }
}

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Trace => LogLevel::Trace,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Error => LogLevel::Error,
        }
    }
}

/// Powerlist CLI main entry point
#[derive(Parser, Debug)]
#[command(name = "powerlist")]
#[command(about = "Curates and unifies ad-block filter lists for Brave")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Output coloring
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Log verbosity (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevelArg>,
}

/// Available powerlist subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the unified list from the configured sources
    Build {
        /// Configuration file
        #[arg(short, long, default_value = "powerlist.toml")]
        config: PathBuf,

        /// Keep the first-seen order instead of sorting
        #[arg(long)]
        no_sort: bool,

        /// Skip removal of redundant subdomain rules
        #[arg(long)]
        no_optimize: bool,

        /// Override the output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSONL diagnostics report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Classify, validate and rephrase list files without writing a list
    Check {
        /// List files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Configuration file providing catalogues (builtin data when absent)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Initialize powerlist in this directory
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Print the effective policy catalogue
    Catalogue {
        /// Configuration file (builtin catalogue when absent)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,
    },
}
