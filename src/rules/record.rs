#![forbid(unsafe_code)]

//! The rule record that flows through every pipeline stage

use crate::types::{RuleKind, ScriptletDialect, SourceRef, Validity};
use serde::Serialize;

/// What kind of header a metadata line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    /// `!#if`, `!#include` and friends
    PreprocessorDirective,
    /// `! Title:`, `! Version:` and friends
    StandardHeader,
    /// `[Adblock Plus 2.0]`
    LegacyVersion,
}

/// How a comment line was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyle {
    Empty,
    /// `! ...`
    Bang,
    /// `# ...` as found in hosts files
    Hash,
}

/// Coarse structural hints produced by the classifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifyHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<ScriptletDialect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentStyle>,
    /// Uses the `#?#` extended CSS separator
    pub extended_css: bool,
    /// Must never be carried into the body of the generated list
    pub discard_from_body: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClassifyHints {
    pub(crate) fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Structured decomposition of a rule, as reported by the syntax engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Components {
    #[default]
    None,
    Network {
        pattern: String,
        options: Vec<String>,
        exception: bool,
    },
    Cosmetic {
        domains: Vec<String>,
        selector: String,
        extended: bool,
        exception: bool,
    },
    Scriptlet {
        domains: Vec<String>,
        name: String,
        arguments: String,
        dialect: ScriptletDialect,
        exception: bool,
    },
    /// Every hostname on the line, in order; a trailing `#` comment is
    /// not part of the rule
    Hosts {
        address: String,
        hostnames: Vec<String>,
    },
}

impl Components {
    /// Network options, or an empty slice for non-network rules
    pub fn options(&self) -> &[String] {
        match self {
            Components::Network { options, .. } => options,
            _ => &[],
        }
    }

    /// Cosmetic selector, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Components::Cosmetic { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// Pattern and options of a plain (non-exception) network rule
    pub fn blocking_network(&self) -> Option<(&str, &[String])> {
        match self {
            Components::Network {
                pattern,
                options,
                exception: false,
            } => Some((pattern.as_str(), options.as_slice())),
            _ => None,
        }
    }
}

/// One input line and everything the pipeline learned about it
///
/// `original_text` is never mutated. When `rewritten_text` is present it is
/// the effective text for everything downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRecord {
    pub id: u64,
    pub original_text: String,
    pub source_ref: SourceRef,
    pub kind: RuleKind,
    pub hints: ClassifyHints,
    pub components: Components,
    pub validity: Validity,
    pub validity_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_strategy: Option<String>,
}

impl RuleRecord {
    /// Creates a freshly classified record in the initial `Valid` state
    pub fn new(
        id: u64,
        original_text: impl Into<String>,
        source_ref: SourceRef,
        kind: RuleKind,
        hints: ClassifyHints,
    ) -> Self {
        Self {
            id,
            original_text: original_text.into(),
            source_ref,
            kind,
            hints,
            components: Components::None,
            validity: Validity::Valid,
            validity_reason: String::new(),
            rewritten_text: None,
            rewrite_strategy: None,
        }
    }

    /// The text downstream stages should use
    pub fn effective_text(&self) -> &str {
        self.rewritten_text.as_deref().unwrap_or(&self.original_text)
    }

    /// Moves the record to `next`, recording why
    pub(crate) fn transition(&mut self, next: Validity, reason: impl Into<String>) {
        debug_assert!(
            self.validity.can_transition_to(next),
            "illegal validity transition {} -> {} for rule {}",
            self.validity,
            next,
            self.id
        );
        self.validity = next;
        self.validity_reason = reason.into();
    }
}
