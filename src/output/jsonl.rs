#![forbid(unsafe_code)]

//! JSONL diagnostics report
//!
//! Outputs one JSON object per line in a deterministic order:
//! 1. One `record` line per rule that was rejected or rewritten, in input order
//! 2. One `implied_scriptlet` line per scriptlet a rewrite depends on
//! 3. One `summary` line

use crate::engine::ValidityCounts;
use crate::engine::rewrite::ImpliedScriptlet;
use crate::rules::RuleRecord;
use crate::types::{RuleKind, Validity};
use serde::Serialize;

/// JSONL report formatter
pub struct JsonlFormatter;

impl JsonlFormatter {
    pub fn new() -> Self {
        JsonlFormatter
    }

    /// Formats the dispositions of `records`
    ///
    /// `lines` is the size of the generated list, when one was produced.
    pub fn format(
        &self,
        records: &[RuleRecord],
        implied_scriptlets: &[ImpliedScriptlet],
        lines: Option<usize>,
    ) -> String {
        let mut output = String::new();

        for record in records.iter().filter(|r| is_reported(r)) {
            push_line(&mut output, &DispositionRecord::from(record));
        }

        for implied in implied_scriptlets {
            push_line(
                &mut output,
                &ImpliedScriptletRecord {
                    record_type: "implied_scriptlet",
                    name: &implied.name,
                    category: &implied.category,
                },
            );
        }

        let counts = ValidityCounts::from_records(records);
        let summary = SummaryRecord {
            record_type: "summary",
            records: records.len(),
            rules: counts.total(),
            lines,
            validity: counts
                .iter()
                .map(|(state, count)| StateCount { state, count })
                .collect(),
        };
        push_line(&mut output, &summary);

        output
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rules that did not pass through untouched
fn is_reported(record: &RuleRecord) -> bool {
    !record.validity.is_accepted() || record.rewritten_text.is_some()
}

fn push_line(output: &mut String, value: &impl Serialize) {
    if let Ok(json) = serde_json::to_string(value) {
        output.push_str(&json);
        output.push('\n');
    }
}

/// Disposition of one rule
#[derive(Debug, Serialize)]
struct DispositionRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    id: u64,
    source: &'a str,
    line: usize,
    kind: RuleKind,
    validity: Validity,
    reason: &'a str,
    original: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rewritten: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<&'a str>,
}

impl<'a> From<&'a RuleRecord> for DispositionRecord<'a> {
    fn from(record: &'a RuleRecord) -> Self {
        Self {
            record_type: "record",
            id: record.id,
            source: &record.source_ref.source,
            line: record.source_ref.line,
            kind: record.kind,
            validity: record.validity,
            reason: &record.validity_reason,
            original: &record.original_text,
            rewritten: record.rewritten_text.as_deref(),
            strategy: record.rewrite_strategy.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImpliedScriptletRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    category: &'a str,
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    records: usize,
    rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<usize>,
    validity: Vec<StateCount>,
}

#[derive(Debug, Serialize)]
struct StateCount {
    state: Validity,
    count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ClassifyHints;
    use crate::types::SourceRef;

    fn record(id: u64, text: &str, kind: RuleKind) -> RuleRecord {
        RuleRecord::new(
            id,
            text,
            SourceRef::new("lists/a.txt", id as usize),
            kind,
            ClassifyHints::default(),
        )
    }

    fn parse(output: &str) -> Vec<serde_json::Value> {
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_format_empty() {
        let output = JsonlFormatter::new().format(&[], &[], None);
        let lines = parse(&output);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "summary");
        assert_eq!(lines[0]["records"], 0);
        assert!(lines[0].get("lines").is_none());
        assert_eq!(lines[0]["validity"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_only_rejected_and_rewritten_records_are_reported() {
        let valid = record(1, "||a.com^", RuleKind::Network);
        let comment = record(2, "! hi", RuleKind::Comment);

        let mut invalid = record(3, "|||bad^", RuleKind::Network);
        invalid.transition(Validity::InvalidSyntax, "bad anchor");

        let mut rewritten = record(4, "||b.com^$popup", RuleKind::Network);
        rewritten.transition(Validity::UnsupportedFeature, "popup");
        rewritten.rewritten_text = Some("||b.com^".to_string());
        rewritten.rewrite_strategy = Some("strip-options".to_string());
        rewritten.transition(Validity::RewrittenValid, "rewritten");

        let records = vec![valid, comment, invalid, rewritten];
        let implied = vec![ImpliedScriptlet {
            name: "hide-if-contains".to_string(),
            category: "custom".to_string(),
        }];
        let lines = parse(&JsonlFormatter::new().format(&records, &implied, Some(2)));

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["type"], "record");
        assert_eq!(lines[0]["id"], 3);
        assert_eq!(lines[0]["validity"], "invalid_syntax");
        assert_eq!(lines[0]["source"], "lists/a.txt");
        assert!(lines[0].get("rewritten").is_none());

        assert_eq!(lines[1]["id"], 4);
        assert_eq!(lines[1]["rewritten"], "||b.com^");
        assert_eq!(lines[1]["strategy"], "strip-options");

        assert_eq!(lines[2]["type"], "implied_scriptlet");
        assert_eq!(lines[2]["name"], "hide-if-contains");

        assert_eq!(lines[3]["type"], "summary");
        assert_eq!(lines[3]["records"], 4);
        assert_eq!(lines[3]["rules"], 3);
        assert_eq!(lines[3]["lines"], 2);
        assert_eq!(lines[3]["validity"][0]["state"], "valid");
        assert_eq!(lines[3]["validity"][0]["count"], 1);
    }
}
