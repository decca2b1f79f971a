//! Check command implementation
//!
//! This module implements the `powerlist check` command, which:
//! - Reads the named list files
//! - Classifies, validates and rephrases every line
//! - Prints each rule's disposition (human or JSONL)
//! - Returns appropriate exit code
//!
//! Nothing is unified or written.

use crate::cli::args::OutputFormat;
use crate::cli::common::{self, EXIT_REJECTED, EXIT_SUCCESS};
use crate::config::Config;
use crate::engine::rephraser::RephraseResult;
use crate::error::PowerlistError;
use crate::output::{HumanFormatter, JsonlFormatter};
use crate::types::ListSource;
use std::fs;
use std::path::{Path, PathBuf};

/// Run the check command
///
/// # Returns
///
/// Exit code:
/// - 0: Every rule is accepted as is or after a rewrite
/// - 1: At least one rule is rejected
/// - 2: Error (configuration, engine or I/O error)
/// - 3: Parse error (invalid TOML configuration)
pub fn run_check(
    files: &[PathBuf],
    format: OutputFormat,
    config: Option<&Path>,
    formatter: &HumanFormatter,
) -> i32 {
    let result = match run_check_inner(files, config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return common::exit_code(&e);
        }
    };

    match format {
        OutputFormat::Human => {
            if let Err(e) = formatter.print_check(&result.records) {
                eprintln!("Error: {}", e);
                return common::EXIT_ERROR;
            }
        }
        OutputFormat::Jsonl => {
            print!(
                "{}",
                JsonlFormatter::new().format(&result.records, &result.implied_scriptlets, None)
            );
        }
    }

    if result.records.iter().all(|r| r.validity.is_accepted()) {
        EXIT_SUCCESS
    } else {
        EXIT_REJECTED
    }
}

/// Internal implementation of check command
fn run_check_inner(
    files: &[PathBuf],
    config: Option<&Path>,
) -> Result<RephraseResult, PowerlistError> {
    let config = match config {
        Some(path) => common::load_config(path)?,
        None => Config::default(),
    };
    let sources = read_sources(files)?;
    let pipeline = common::build_pipeline(&config)?;
    pipeline.process(&sources)
}

/// Reads every named file; a file that cannot be read fails the check
fn read_sources(files: &[PathBuf]) -> Result<Vec<ListSource>, PowerlistError> {
    files
        .iter()
        .map(|path| {
            let bytes = fs::read(path)?;
            Ok(ListSource::new(
                path.display().to_string(),
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        })
        .collect()
}
