//! Parsing and validation for powerlist.toml configuration files

use crate::config::catalogue::{Catalogue, CatalogueDefinition};
use crate::config::scriptlets::ScriptletCatalogue;
use crate::engine::unifier::UnifierOptions;
use crate::error::{CatalogueError, ConfigError};
use crate::rules::builtin;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct for powerlist.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Powerlist metadata and sources
    pub powerlist: PowerlistMeta,

    /// Policy catalogue selection
    #[serde(default)]
    pub catalogue: CatalogueConfig,

    /// Scriptlet metadata selection
    #[serde(default)]
    pub scriptlets: ScriptletsConfig,

    /// Unifier switches
    #[serde(default)]
    pub unifier: UnifierConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            powerlist: PowerlistMeta {
                version: "1".to_string(),
                sources: Vec::new(),
                include: default_include(),
                exclude: Vec::new(),
            },
            catalogue: CatalogueConfig::default(),
            scriptlets: ScriptletsConfig::default(),
            unifier: UnifierConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative paths inside the file are resolved against the directory
    /// containing it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.powerlist.version != "1" {
            return Err(ConfigError::Validation(format!(
                "Unsupported configuration version '{}'. Expected '1'",
                self.powerlist.version
            )));
        }

        for pattern in &self.powerlist.include {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid include glob pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        for pattern in &self.powerlist.exclude {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid exclude glob pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        if self.output.header.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Output header title must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Extra checks that only matter when building a list
    pub fn validate_for_build(&self) -> Result<(), ConfigError> {
        if self.powerlist.sources.is_empty() {
            return Err(ConfigError::Validation(
                "No sources configured. Add list files or directories to [powerlist] sources."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Makes every relative path relative to `base`
    pub fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.powerlist.sources.iter_mut().for_each(join);
        self.catalogue.path.iter_mut().for_each(join);
        self.scriptlets.metadata.iter_mut().for_each(join);
        join(&mut self.output.path);
        self.output.report.iter_mut().for_each(join);
    }

    /// The effective policy catalogue
    ///
    /// The builtin catalogue is extended with the configured one, or replaced
    /// by it when `replace_builtin` is set.
    pub fn load_catalogue(&self) -> Result<Catalogue, CatalogueError> {
        let user = self
            .catalogue
            .path
            .as_ref()
            .map(CatalogueDefinition::load)
            .transpose()?;

        let definition = match (user, self.catalogue.replace_builtin) {
            (Some(user), true) => user,
            (Some(user), false) => {
                let mut definition = builtin::builtin_catalogue()?;
                definition.extend(user);
                definition
            }
            (None, true) => CatalogueDefinition::default(),
            (None, false) => builtin::builtin_catalogue()?,
        };
        definition.compile()
    }

    /// The effective scriptlet metadata, if any is configured
    pub fn load_scriptlets(&self) -> Result<Option<ScriptletCatalogue>, CatalogueError> {
        let mut catalogue = if self.scriptlets.builtin {
            Some(builtin::builtin_scriptlets()?)
        } else {
            None
        };
        if let Some(path) = &self.scriptlets.metadata {
            let loaded = ScriptletCatalogue::load(path)?;
            match &mut catalogue {
                Some(existing) => existing.extend(loaded),
                None => catalogue = Some(loaded),
            }
        }
        Ok(catalogue)
    }

    pub fn unifier_options(&self) -> UnifierOptions {
        UnifierOptions {
            optimize: self.unifier.optimize,
            sort: self.unifier.sort,
        }
    }
}

/// `[powerlist]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerlistMeta {
    /// Configuration version (must be "1")
    pub version: String,

    /// List files or directories
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// File patterns to include when walking directories
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// File patterns to exclude when walking directories
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

fn default_true() -> bool {
    true
}

/// `[catalogue]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogueConfig {
    /// User catalogue file
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Use only the user catalogue
    #[serde(default)]
    pub replace_builtin: bool,
}

/// `[scriptlets]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptletsConfig {
    /// Additional scriptlet metadata JSON
    #[serde(default)]
    pub metadata: Option<PathBuf>,

    /// Include the builtin scriptlet metadata
    #[serde(default = "default_true")]
    pub builtin: bool,
}

impl Default for ScriptletsConfig {
    fn default() -> Self {
        Self {
            metadata: None,
            builtin: true,
        }
    }
}

/// `[unifier]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifierConfig {
    #[serde(default = "default_true")]
    pub optimize: bool,

    #[serde(default = "default_true")]
    pub sort: bool,
}

impl Default for UnifierConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            sort: true,
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the generated list is written
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Optional JSONL diagnostics report
    #[serde(default)]
    pub report: Option<PathBuf>,

    #[serde(default)]
    pub header: HeaderConfig,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("powerlist.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            report: None,
            header: HeaderConfig::default(),
        }
    }
}

/// `[output.header]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default = "default_author")]
    pub author: String,
}

fn default_title() -> String {
    "Brave Power List".to_string()
}

fn default_description() -> String {
    "Unified filter list curated for Brave".to_string()
}

fn default_author() -> String {
    "powerlist".to_string()
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            author: default_author(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
