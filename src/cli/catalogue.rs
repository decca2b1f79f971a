//! Catalogue command implementation
//!
//! Prints the policy catalogue a build would use: counts per section and the
//! rewrite rules in the order the rephraser attempts them.

use crate::cli::args::OutputFormat;
use crate::cli::common::{self, EXIT_SUCCESS};
use crate::config::{Catalogue, CatalogueSummary, Config};
use crate::engine::RewriteRule;
use crate::error::PowerlistError;
use serde::Serialize;
use std::path::Path;

/// Run the catalogue command
pub fn run_catalogue(config: Option<&Path>, format: OutputFormat) -> i32 {
    match run_catalogue_inner(config) {
        Ok((catalogue, scriptlets)) => {
            let rendered = match format {
                OutputFormat::Human => format_human(&catalogue, scriptlets),
                OutputFormat::Jsonl => format_jsonl(&catalogue, scriptlets),
            };
            print!("{}", rendered);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            common::exit_code(&e)
        }
    }
}

fn run_catalogue_inner(config: Option<&Path>) -> Result<(Catalogue, usize), PowerlistError> {
    let config = match config {
        Some(path) => common::load_config(path)?,
        None => Config::default(),
    };
    let catalogue = config.load_catalogue()?;
    let scriptlets = config.load_scriptlets()?.map_or(0, |s| s.len());
    Ok((catalogue, scriptlets))
}

fn format_human(catalogue: &Catalogue, scriptlets: usize) -> String {
    let summary = catalogue.summary();
    let mut out = String::new();
    out.push_str("Policy catalogue:\n");
    out.push_str(&format!(
        "  unsupported options:         {}\n",
        summary.unsupported_options
    ));
    out.push_str(&format!(
        "  unsupported option patterns: {}\n",
        summary.option_patterns
    ));
    out.push_str(&format!(
        "  unsupported selectors:       {}\n",
        summary.selector_patterns
    ));
    out.push_str(&format!(
        "  foreign dialect markers:     {}\n",
        summary.foreign_markers
    ));
    out.push_str(&format!(
        "  foreign network options:     {}\n",
        summary.foreign_options
    ));
    out.push_str(&format!("  known scriptlets:            {}\n", scriptlets));
    out.push('\n');
    out.push_str(&format!("Rewrite rules ({}):\n", summary.rewrite_rules));
    for (index, rule) in catalogue.rewrite_rules().iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", index + 1, rule.name()));
    }
    out
}

#[derive(Serialize)]
struct SummaryLine {
    #[serde(rename = "type")]
    record_type: &'static str,
    #[serde(flatten)]
    summary: CatalogueSummary,
    scriptlets: usize,
}

#[derive(Serialize)]
struct RewriteLine<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    order: usize,
    #[serde(flatten)]
    rule: &'a RewriteRule,
}

fn format_jsonl(catalogue: &Catalogue, scriptlets: usize) -> String {
    let mut out = String::new();
    for (index, rule) in catalogue.rewrite_rules().iter().enumerate() {
        let line = RewriteLine {
            record_type: "rewrite_rule",
            order: index + 1,
            rule,
        };
        if let Ok(json) = serde_json::to_string(&line) {
            out.push_str(&json);
            out.push('\n');
        }
    }
    let summary = SummaryLine {
        record_type: "catalogue",
        summary: catalogue.summary(),
        scriptlets,
    };
    if let Ok(json) = serde_json::to_string(&summary) {
        out.push_str(&json);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_lists_rules_in_order() {
        let (catalogue, scriptlets) = run_catalogue_inner(None).unwrap();
        let text = format_human(&catalogue, scriptlets);
        assert!(text.contains("Rewrite rules"));
        assert!(text.contains("  1. strip-options\n"));
        assert!(text.contains("known scriptlets:            8"));
        assert!(text.contains("foreign network options:     3"));
    }

    #[test]
    fn test_jsonl_ends_with_summary() {
        let (catalogue, scriptlets) = run_catalogue_inner(None).unwrap();
        let text = format_jsonl(&catalogue, scriptlets);
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines[0]["type"], "rewrite_rule");
        assert_eq!(lines[0]["order"], 1);
        assert_eq!(lines[0]["strategy"], "strip-options");

        let last = lines.last().unwrap();
        assert_eq!(last["type"], "catalogue");
        assert_eq!(last["scriptlets"], 8);
        assert_eq!(last["foreign_options"], 3);
        assert_eq!(
            last["rewrite_rules"].as_u64().unwrap() as usize,
            lines.len() - 1
        );
    }
}
