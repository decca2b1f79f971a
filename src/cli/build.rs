//! Build command implementation
//!
//! This module implements the `powerlist build` command, which:
//! - Loads configuration from powerlist.toml
//! - Discovers and reads the configured list sources
//! - Runs the curation pipeline
//! - Writes the generated list and, optionally, a JSONL report
//! - Returns appropriate exit code

use crate::cli::common::{self, EXIT_SUCCESS};
use crate::engine::{PipelineStats, SourceWalker};
use crate::error::PowerlistError;
use crate::output::{HumanFormatter, JsonlFormatter, ListGenerator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Command-line overrides for a build
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub config: PathBuf,
    pub no_sort: bool,
    pub no_optimize: bool,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

/// Run the build command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error (configuration, catalogue, engine or I/O error)
/// - 3: Parse error (invalid TOML configuration)
pub fn run_build(options: &BuildOptions, formatter: &HumanFormatter) -> i32 {
    match run_build_inner(options) {
        Ok((stats, output)) => {
            if let Err(e) = formatter.print_build(&stats, &output.display().to_string()) {
                warn!(error = %e, "failed to print build summary");
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            common::exit_code(&e)
        }
    }
}

/// Internal implementation of build command
fn run_build_inner(options: &BuildOptions) -> Result<(PipelineStats, PathBuf), PowerlistError> {
    let mut config = common::load_config(&options.config)?;
    config.validate_for_build()?;
    if options.no_sort {
        config.unifier.sort = false;
    }
    if options.no_optimize {
        config.unifier.optimize = false;
    }

    let walker = SourceWalker::new(&config.powerlist.include, &config.powerlist.exclude)?;
    let sources = walker.load(&config.powerlist.sources);
    if sources.is_empty() {
        warn!("no readable sources found, the list will only contain its header");
    }

    let pipeline = common::build_pipeline(&config)?;
    let output = pipeline.run(&sources)?;

    let list_path = options
        .output
        .clone()
        .unwrap_or_else(|| config.output.path.clone());
    ListGenerator::new(config.output.header.clone()).write(&list_path, &output.lines)?;

    if let Some(report_path) = options.report.as_ref().or(config.output.report.as_ref()) {
        let report = JsonlFormatter::new().format(
            &output.records,
            &output.implied_scriptlets,
            Some(output.lines.len()),
        );
        write_report(report_path, &report)?;
        info!(path = %report_path.display(), "wrote report");
    }

    Ok((output.stats, list_path))
}

fn write_report(path: &Path, report: &str) -> Result<(), PowerlistError> {
    let write_error = |source| PowerlistError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, report).map_err(write_error)
}
