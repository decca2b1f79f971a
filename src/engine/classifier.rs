#![forbid(unsafe_code)]

//! Line classification
//!
//! [`classify`] assigns a [`RuleKind`] and structural hints to one line of a
//! filter list. It is pure and total: every line gets exactly one kind, and
//! classifying the same text twice gives the same answer. [`ingest`] turns
//! ordered list sources into freshly classified records.

use crate::rules::grammar::{self, Marker};
use crate::rules::{ClassifyHints, CommentStyle, HeaderKind, RuleRecord};
use crate::types::{ListSource, RuleKind, ScriptletDialect, SourceRef};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

static PREPROCESSOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^!#\s*(if|else|endif|include)\b").expect("preprocessor regex is valid")
});

static STANDARD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^!\s*(title|version|expires|homepage|description)\s*:")
        .expect("header regex is valid")
});

static LEGACY_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\[\s*(adblock(\s+plus)?|adguard|ublock(\s+origin)?)(\s+[\d.]+)?\s*\]$")
        .expect("legacy version regex is valid")
});

static HOSTS_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}\s+").expect("hosts address regex is valid")
});

static HOSTS_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}\s+[\w.-]+").expect("hosts rule regex is valid")
});

/// Classifies one line, first match wins
pub fn classify(line: &str) -> (RuleKind, ClassifyHints) {
    let line = line.trim();

    if line.is_empty() {
        return comment(CommentStyle::Empty, "empty line");
    }

    if line.starts_with('!') {
        if PREPROCESSOR.is_match(line) {
            return header(HeaderKind::PreprocessorDirective, false);
        }
        if STANDARD_HEADER.is_match(line) {
            return header(HeaderKind::StandardHeader, false);
        }
        return comment(CommentStyle::Bang, "comment");
    }

    if LEGACY_VERSION.is_match(line) {
        return header(HeaderKind::LegacyVersion, true);
    }

    let marker = grammar::find_marker(line);

    if line.starts_with('#')
        && !matches!(marker, Some((0, _)))
        && !HOSTS_ADDRESS.is_match(line)
    {
        return comment(CommentStyle::Hash, "hosts-style comment");
    }

    if let Some((_, marker)) = marker {
        let hints = ClassifyHints {
            dialect: scriptlet_dialect(marker),
            extended_css: marker.is_extended(),
            ..ClassifyHints::default()
        };
        let kind = if marker.is_scriptlet() {
            RuleKind::Scriptlet
        } else {
            RuleKind::Cosmetic
        };
        return (kind, hints);
    }

    if HOSTS_RULE.is_match(line) {
        return (RuleKind::HostsRule, ClassifyHints::default());
    }

    if let Some(c) = line.chars().find(|c| c.is_control() && *c != '\t') {
        return (
            RuleKind::Unknown,
            ClassifyHints::with_reason(format!(
                "line carries control character U+{:04X}",
                c as u32
            )),
        );
    }

    (RuleKind::Network, ClassifyHints::default())
}

fn comment(style: CommentStyle, reason: &str) -> (RuleKind, ClassifyHints) {
    (
        RuleKind::Comment,
        ClassifyHints {
            comment: Some(style),
            ..ClassifyHints::with_reason(reason)
        },
    )
}

fn header(kind: HeaderKind, discard: bool) -> (RuleKind, ClassifyHints) {
    (
        RuleKind::MetadataHeader,
        ClassifyHints {
            header: Some(kind),
            discard_from_body: discard,
            ..ClassifyHints::default()
        },
    )
}

fn scriptlet_dialect(marker: Marker) -> Option<ScriptletDialect> {
    match marker {
        Marker::Scriptlet | Marker::ScriptletException => Some(ScriptletDialect::UblockBrave),
        Marker::AdGuardScriptlet | Marker::AdGuardScriptletException => {
            Some(ScriptletDialect::AdGuard)
        }
        Marker::AbpSnippet => Some(ScriptletDialect::AbpSnippet),
        _ => None,
    }
}

/// Splits sources into lines and classifies them
///
/// Ids are assigned sequentially across all sources in input order, starting
/// at 1. Stored text is trimmed of surrounding whitespace.
pub fn ingest(sources: &[ListSource]) -> Vec<RuleRecord> {
    let lines: Vec<(&str, usize, &str)> = sources
        .iter()
        .flat_map(|source| {
            source
                .content
                .lines()
                .enumerate()
                .map(move |(i, line)| (source.id.as_str(), i + 1, line))
        })
        .collect();

    lines
        .into_par_iter()
        .enumerate()
        .map(|(index, (source, line, text))| {
            let text = text.trim();
            let (kind, hints) = classify(text);
            RuleRecord::new(
                index as u64 + 1,
                text,
                SourceRef::new(source, line),
                kind,
                hints,
            )
        })
        .collect()
}
