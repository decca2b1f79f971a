#![forbid(unsafe_code)]

//! Core domain types for powerlist
//!
//! This module defines the fundamental types used throughout the pipeline:
//! rule kinds, the validity state machine and provenance references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The syntactic family of a filter-list line
///
/// Assigned once by the classifier and never changed afterwards, even when a
/// rewrite moves the rule into another family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Network,
    Cosmetic,
    Scriptlet,
    HostsRule,
    Comment,
    MetadataHeader,
    Unknown,
}

impl RuleKind {
    /// Kinds that express a blocking or hiding instruction
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RuleKind::Network | RuleKind::Cosmetic | RuleKind::Scriptlet | RuleKind::HostsRule
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Network => "network",
            RuleKind::Cosmetic => "cosmetic",
            RuleKind::Scriptlet => "scriptlet",
            RuleKind::HostsRule => "hosts_rule",
            RuleKind::Comment => "comment",
            RuleKind::MetadataHeader => "metadata_header",
            RuleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scriptlet notation a scriptlet rule was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptletDialect {
    /// `##+js(...)` as used by uBlock Origin and Brave
    UblockBrave,
    /// `#%#//scriptlet(...)`
    AdGuard,
    /// `#$#snippet args`
    AbpSnippet,
}

/// Disposition of a rule record
///
/// The first five states are assigned by the validator, the last three only
/// by the rephraser. Transitions only move forward, see
/// [`Validity::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    #[default]
    Valid,
    InvalidSyntax,
    UnsupportedFeature,
    PotentialForeignDialect,
    NeedsRewriting,
    CannotRewrite,
    RewrittenValid,
    RewriteFailedValidation,
}

impl Validity {
    /// Every state, in declaration order
    pub const ALL: [Validity; 8] = [
        Validity::Valid,
        Validity::InvalidSyntax,
        Validity::UnsupportedFeature,
        Validity::PotentialForeignDialect,
        Validity::NeedsRewriting,
        Validity::CannotRewrite,
        Validity::RewrittenValid,
        Validity::RewriteFailedValidation,
    ];

    /// States whose rules may appear in the final list
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validity::Valid | Validity::RewrittenValid)
    }

    /// States the rephraser picks up
    pub fn wants_rewrite(&self) -> bool {
        matches!(
            self,
            Validity::UnsupportedFeature
                | Validity::PotentialForeignDialect
                | Validity::NeedsRewriting
        )
    }

    /// States only the rephraser may assign
    pub fn is_rewrite_outcome(&self) -> bool {
        matches!(
            self,
            Validity::CannotRewrite | Validity::RewrittenValid | Validity::RewriteFailedValidation
        )
    }

    /// Whether moving from `self` to `next` is a legal forward transition
    pub fn can_transition_to(&self, next: Validity) -> bool {
        match self {
            Validity::Valid => !next.is_rewrite_outcome() && next != Validity::Valid,
            s if s.wants_rewrite() => next.is_rewrite_outcome(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::InvalidSyntax => "invalid_syntax",
            Validity::UnsupportedFeature => "unsupported_feature",
            Validity::PotentialForeignDialect => "potential_foreign_dialect",
            Validity::NeedsRewriting => "needs_rewriting",
            Validity::CannotRewrite => "cannot_rewrite",
            Validity::RewrittenValid => "rewritten_valid",
            Validity::RewriteFailedValidation => "rewrite_failed_validation",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a line came from, for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Identifier of the originating list (path or URL)
    pub source: String,
    /// 1-indexed line number within that list
    pub line: usize,
}

impl SourceRef {
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// One raw filter list handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSource {
    /// Identifier of the list (path or URL)
    pub id: String,
    /// Full list text
    pub content: String,
}

impl ListSource {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}
