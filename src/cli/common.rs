//! Common helper functions shared across CLI commands
//!
//! This module provides shared functionality for loading configuration,
//! assembling the pipeline and mapping errors to exit codes.

use crate::config::Config;
use crate::engine::Pipeline;
use crate::error::{ConfigError, PowerlistError};
use crate::rules::HeuristicSyntaxEngine;
use std::path::Path;
use std::sync::Arc;

/// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_REJECTED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

/// Load a powerlist.toml configuration
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file does not exist or cannot be read.
/// Returns `ConfigError::Parse` if the file is invalid.
pub(crate) fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "{} not found. Run 'powerlist init' to create it.",
                path.display()
            ),
        )));
    }

    Config::load(path)
}

/// Assembles a pipeline from the catalogues and switches in `config`
pub(crate) fn build_pipeline(config: &Config) -> Result<Pipeline, PowerlistError> {
    let catalogue = config.load_catalogue()?;
    let scriptlets = config.load_scriptlets()?;
    Ok(
        Pipeline::new(Arc::new(HeuristicSyntaxEngine::new()), catalogue)
            .with_scriptlets(scriptlets)
            .with_options(config.unifier_options()),
    )
}

/// Exit code for a failed command
pub(crate) fn exit_code(error: &PowerlistError) -> i32 {
    match error {
        PowerlistError::Config(ConfigError::Parse(_)) => EXIT_PARSE_ERROR,
        _ => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_config(&temp.path().join("powerlist.toml")).unwrap_err();
        assert!(err.to_string().contains("powerlist init"));
    }

    #[test]
    fn test_exit_codes() {
        let parse = Config::parse("not toml [").unwrap_err();
        assert_eq!(exit_code(&PowerlistError::from(parse)), EXIT_PARSE_ERROR);

        let invalid = Config::parse("[powerlist]\nversion = \"9\"\n").unwrap_err();
        assert_eq!(exit_code(&PowerlistError::from(invalid)), EXIT_ERROR);
    }

    #[test]
    fn test_build_pipeline_with_default_config() {
        let pipeline = build_pipeline(&Config::default()).unwrap();
        assert!(pipeline.catalogue().summary().rewrite_rules > 0);
    }
}
