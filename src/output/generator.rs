#![forbid(unsafe_code)]

//! Generated list writer
//!
//! Prepends the standard `! Title` / `! Version` header block to the unified
//! lines and writes the result.

use crate::config::HeaderConfig;
use crate::error::PowerlistError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes the final list with its header
#[derive(Debug, Clone)]
pub struct ListGenerator {
    header: HeaderConfig,
}

impl ListGenerator {
    pub fn new(header: HeaderConfig) -> Self {
        Self { header }
    }

    /// Header lines stamped with `timestamp`
    pub fn header_lines(&self, timestamp: DateTime<Utc>) -> Vec<String> {
        vec![
            format!("! Title: {}", self.header.title),
            format!("! Description: {}", self.header.description),
            format!("! Author: {}", self.header.author),
            format!("! Version: {}", timestamp.format("%Y%m%d.%H%M%S")),
            "!".to_string(),
        ]
    }

    /// Full file contents, newline terminated
    pub fn render(&self, lines: &[String], timestamp: DateTime<Utc>) -> String {
        let mut output = String::new();
        for line in self.header_lines(timestamp).iter().chain(lines) {
            output.push_str(line);
            output.push('\n');
        }
        output
    }

    /// Writes the list to `path`, creating parent directories
    pub fn write(&self, path: &Path, lines: &[String]) -> Result<(), PowerlistError> {
        let write_error = |source| PowerlistError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = self.render(lines, Utc::now());
        fs::write(path, content).map_err(write_error)?;

        info!(
            path = %path.display(),
            rules = lines.len(),
            "generated list"
        );
        Ok(())
    }
}
