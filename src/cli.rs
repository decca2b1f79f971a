//! CLI argument parsing and command dispatch

pub mod args;
pub mod build;
pub mod catalogue;
pub mod check;
pub(crate) mod common;
pub mod init;

// Re-export types for convenient access
pub use args::{Cli, ColorChoice, Command, LogLevelArg, OutputFormat};
pub use common::{EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_REJECTED, EXIT_SUCCESS};
