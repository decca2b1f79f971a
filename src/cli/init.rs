//! Initialize a powerlist project
//!
//! Creates the configuration files and the sources directory for a new list.

use std::fs;
use std::path::Path;

/// Default content for powerlist.toml
const DEFAULT_POWERLIST_TOML: &str = r#"[powerlist]
version = "1"

# Files or directories of filter lists, in priority order
sources = ["lists"]

# File patterns to include when walking directories
include = ["**/*.txt"]

# File patterns to exclude
# exclude = ["**/disabled/**"]

[catalogue]
# Extends the builtin policy catalogue
path = "catalogue.toml"
# replace_builtin = true

[scriptlets]
# Additional scriptlet metadata (JSON)
# metadata = "scriptlets.json"
builtin = true

[unifier]
optimize = true
sort = true

[output]
path = "dist/powerlist.txt"
# report = "dist/report.jsonl"

[output.header]
title = "Brave Power List"
description = "Unified filter list curated for Brave"
author = "powerlist"

[logging]
level = "info"
"#;

/// Default content for catalogue.toml
const DEFAULT_CATALOGUE_TOML: &str = r#"# Policy catalogue additions
# Entries here are merged into the builtin catalogue.

# [network]
# unsupported_options = ["webrtc"]
# unsupported_option_patterns = ['(?i)(^|,)header=']

# [cosmetic]
# unsupported_selector_patterns = ['(?i):min-text-length\(']

# [foreign]
# markers = ['\$\$']
# options = ["network"]

# [[rewrite]]
# strategy = "snippet-call"
# [rewrite.snippets]
# hide-if-has-and-matches-style = { scriptlet = "hide-if-matches-style" }
"#;

/// Error type for init command
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path error
    #[error("Path error: {0}")]
    Path(String),
}

/// Result of init command
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InitResult {
    /// Files that were created
    pub created: Vec<String>,
    /// Files that were skipped (already existed)
    pub skipped: Vec<String>,
    /// Files that were overwritten
    pub overwritten: Vec<String>,
}

/// Run the init command
///
/// Creates the following files and directories:
/// - powerlist.toml (main configuration)
/// - catalogue.toml (policy catalogue additions)
/// - lists/ (directory for source lists)
///
/// # Arguments
/// * `force` - If true, overwrite existing files. If false, skip existing files.
pub fn run_init(force: bool) -> Result<InitResult, InitError> {
    let mut result = InitResult::default();

    handle_file(
        Path::new("powerlist.toml"),
        DEFAULT_POWERLIST_TOML,
        force,
        &mut result,
    )?;
    handle_file(
        Path::new("catalogue.toml"),
        DEFAULT_CATALOGUE_TOML,
        force,
        &mut result,
    )?;
    create_directory("lists", &mut result)?;

    Ok(result)
}

/// Handle creation of a single file
fn handle_file(
    path: &Path,
    content: &str,
    force: bool,
    result: &mut InitResult,
) -> Result<(), InitError> {
    let path_str = path_to_string(path)?;

    if path.exists() {
        if force {
            fs::write(path, content)?;
            result.overwritten.push(path_str);
        } else {
            result.skipped.push(path_str);
        }
    } else {
        fs::write(path, content)?;
        result.created.push(path_str);
    }

    Ok(())
}

/// Create a directory if it doesn't exist
fn create_directory(path: &str, result: &mut InitResult) -> Result<(), InitError> {
    let dir_path = Path::new(path);

    if !dir_path.exists() {
        fs::create_dir_all(dir_path)?;
        result.created.push(format!("{}/", path));
        return Ok(());
    }
    if dir_path.is_dir() {
        Ok(())
    } else {
        Err(InitError::Path(format!(
            "Path '{}' exists but is not a directory",
            path
        )))
    }
}

/// Convert a path to a string representation
fn path_to_string(path: &Path) -> Result<String, InitError> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| InitError::Path(format!("Invalid UTF-8 in path: {:?}", path)))
}
