#![forbid(unsafe_code)]

//! Powerlist: curation of ad-block filter lists for Brave
//!
//! Raw lines from many lists are classified, validated against the Brave
//! filter syntax, rephrased where a foreign or unsupported construct has a
//! Brave equivalent, and finally deduplicated and sorted into one list.
//!
//! The stages live in [`engine`]; [`engine::Pipeline`] drives them in order.
//! The rule syntax check is pluggable through [`rules::RuleSyntaxEngine`].

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod rules;
pub mod types;

// Re-export error types for convenient access
pub use error::{CatalogueError, ConfigError, PowerlistError, SyntaxEngineError};

// Re-export core domain types for convenient access
pub use engine::{Pipeline, PipelineOutput};
pub use rules::{RuleRecord, RuleSyntaxEngine};
pub use types::{ListSource, RuleKind, SourceRef, Validity};
