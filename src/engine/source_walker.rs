#![forbid(unsafe_code)]

//! Discovery and loading of local filter-list sources
//!
//! Configured source paths are either files, taken as they are, or
//! directories, walked with gitignore support and filtered by include and
//! exclude globs. A source that cannot be read is logged and skipped; one
//! broken list never stops a build.

use crate::types::ListSource;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while setting up source discovery
#[derive(Debug, Error)]
pub enum SourceWalkerError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
}

/// Finds and reads list files
#[derive(Debug, Clone)]
pub struct SourceWalker {
    include_set: Option<GlobSet>,
    exclude_set: GlobSet,
}

impl SourceWalker {
    /// Creates a walker
    ///
    /// # Arguments
    /// * `include` - Include patterns (empty means include all)
    /// * `exclude` - Exclude patterns (applied after include)
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, SourceWalkerError> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include)?)
        };

        // Always exclude .git directory, merging with user-provided excludes
        let mut exclude_patterns = exclude.to_vec();
        exclude_patterns.push("**/.git/**".to_string());
        let exclude_set = build_globset(&exclude_patterns)?;

        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    /// Resolves configured paths to list files
    ///
    /// Files named directly are always taken. Files found in directories must
    /// pass the glob filters and come out sorted by path. A path is never
    /// returned twice.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                if seen.insert(path.clone()) {
                    files.push(path.clone());
                }
                continue;
            }
            if !path.is_dir() {
                warn!(path = %path.display(), "source path does not exist, skipping");
                continue;
            }

            let mut found = self.walk_dir(path);
            found.sort();
            for file in found {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }
        files
    }

    fn walk_dir(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(root)
            .hidden(false) // Don't skip hidden files by default
            .git_ignore(true) // Respect .gitignore
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "failed to walk source directory");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if let Some(include_set) = &self.include_set
                && !include_set.is_match(relative)
                && !include_set.is_match(path)
            {
                debug!(path = %path.display(), "not included");
                continue;
            }
            if self.exclude_set.is_match(relative) || self.exclude_set.is_match(path) {
                debug!(path = %path.display(), "excluded");
                continue;
            }
            files.push(path.to_path_buf());
        }
        files
    }

    /// Discovers and reads every source
    ///
    /// Invalid UTF-8 is replaced rather than rejected. Unreadable files are
    /// skipped with a warning.
    pub fn load(&self, paths: &[PathBuf]) -> Vec<ListSource> {
        self.discover(paths)
            .into_iter()
            .filter_map(|path| match fs::read(&path) {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    debug!(path = %path.display(), bytes = bytes.len(), "loaded source");
                    Some(ListSource::new(path.display().to_string(), content))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read source, skipping");
                    None
                }
            })
            .collect()
    }
}

/// Builds a GlobSet from patterns
fn build_globset(patterns: &[String]) -> Result<GlobSet, SourceWalkerError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| SourceWalkerError::InvalidGlob {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| SourceWalkerError::InvalidGlob {
        pattern: "<globset>".to_string(),
        source: e,
    })
}
