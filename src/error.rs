//! Error types for powerlist
//!
//! Per-rule problems (bad syntax, unsupported features, failed rewrites) are
//! never errors: they are recorded as a [`Validity`](crate::types::Validity)
//! on the rule record. The types here cover everything that can stop a run.

use std::path::PathBuf;

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantic validation failure
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// I/O error while reading the configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading policy catalogues or scriptlet metadata
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// Invalid catalogue definition
    #[error("Invalid catalogue definition: {0}")]
    InvalidDefinition(String),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    /// Invalid scriptlet metadata
    #[error("Invalid scriptlet metadata: {0}")]
    InvalidMetadata(String),
}

/// The rule syntax engine could not be consulted at all
///
/// This is distinct from the engine rejecting a rule, which is an ordinary
/// per-record outcome.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxEngineError {
    /// The engine is not available
    #[error("Rule syntax engine unavailable: {0}")]
    Unavailable(String),

    /// The engine failed while processing a rule
    #[error("Rule syntax engine failed on '{rule}': {message}")]
    Internal { rule: String, message: String },
}

/// Top-level error type for powerlist
#[derive(Debug, thiserror::Error)]
pub enum PowerlistError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalogue error
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// Syntax engine failure
    #[error("Engine error: {0}")]
    Engine(#[from] SyntaxEngineError),

    /// Source discovery error
    #[error("Source error: {0}")]
    Sources(#[from] crate::engine::source_walker::SourceWalkerError),

    /// Failure writing the generated list or report
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
