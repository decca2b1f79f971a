#![forbid(unsafe_code)]

//! Dialect rephrasing
//!
//! Records the validator flagged as unsupported, foreign or needing a rewrite
//! get one chance at conversion: the first [`RewriteRule`] whose precondition
//! holds is applied and the result is re-submitted to the syntax engine.

use crate::config::{Catalogue, ScriptletCatalogue};
use crate::engine::rewrite::{ImpliedScriptlet, RewriteContext, RewriteOutcome, RewriteRule};
use crate::error::SyntaxEngineError;
use crate::rules::{RuleRecord, RuleSyntaxEngine};
use crate::types::Validity;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Records after rephrasing plus the scriptlets the rewrites rely on
#[derive(Debug, Clone, Default)]
pub struct RephraseResult {
    pub records: Vec<RuleRecord>,
    /// Deduplicated, in first-seen order
    pub implied_scriptlets: Vec<ImpliedScriptlet>,
}

pub struct Rephraser<'a> {
    engine: &'a dyn RuleSyntaxEngine,
    catalogue: &'a Catalogue,
    scriptlets: Option<&'a ScriptletCatalogue>,
}

impl<'a> Rephraser<'a> {
    pub fn new(
        engine: &'a dyn RuleSyntaxEngine,
        catalogue: &'a Catalogue,
        scriptlets: Option<&'a ScriptletCatalogue>,
    ) -> Self {
        Self {
            engine,
            catalogue,
            scriptlets,
        }
    }

    /// Rephrases one record; records not awaiting a rewrite pass through
    pub fn rephrase(
        &self,
        mut record: RuleRecord,
    ) -> Result<(RuleRecord, Vec<ImpliedScriptlet>), SyntaxEngineError> {
        if !record.validity.wants_rewrite() {
            return Ok((record, Vec::new()));
        }

        let Some(rule) = self.select(&record) else {
            let reason = format!("{}; no rewrite strategy applies", record.validity_reason);
            record.transition(Validity::CannotRewrite, reason);
            return Ok((record, Vec::new()));
        };

        let ctx = RewriteContext {
            policy: self.catalogue,
            scriptlets: self.scriptlets,
        };
        let (text, label, notices) = match rule.apply(&record, &ctx) {
            RewriteOutcome::Rewritten {
                text,
                label,
                notices,
            } => (text, label, notices),
            RewriteOutcome::Inapplicable(why) => {
                let reason = format!("{}; {}: {}", record.validity_reason, rule.name(), why);
                record.transition(Validity::CannotRewrite, reason);
                return Ok((record, Vec::new()));
            }
        };

        if text == record.original_text {
            let reason = format!(
                "{}; {} left the rule unchanged",
                record.validity_reason,
                rule.name()
            );
            record.transition(Validity::CannotRewrite, reason);
            return Ok((record, Vec::new()));
        }

        let report = self.engine.validate(&text)?;
        record.rewritten_text = Some(text);
        record.rewrite_strategy = Some(label);

        if report.accepted {
            debug!(id = record.id, strategy = rule.name(), "rewrite accepted");
            record.components = report.components;
            let reason = format!("rewritten by {}", rule.name());
            record.transition(Validity::RewrittenValid, reason);
            Ok((record, notices))
        } else {
            let why = report
                .reason
                .unwrap_or_else(|| "rejected by syntax engine".to_string());
            debug!(id = record.id, strategy = rule.name(), %why, "rewrite rejected");
            record.transition(
                Validity::RewriteFailedValidation,
                format!("rewrite by {} rejected: {}", rule.name(), why),
            );
            Ok((record, Vec::new()))
        }
    }

    /// Rephrases a batch, preserving order
    pub fn rephrase_all(
        &self,
        records: Vec<RuleRecord>,
    ) -> Result<RephraseResult, SyntaxEngineError> {
        let processed: Vec<(RuleRecord, Vec<ImpliedScriptlet>)> = records
            .into_par_iter()
            .map(|record| self.rephrase(record))
            .collect::<Result<_, _>>()?;

        let mut seen = HashSet::new();
        let mut result = RephraseResult::default();
        for (record, notices) in processed {
            for notice in notices {
                if seen.insert(notice.clone()) {
                    result.implied_scriptlets.push(notice);
                }
            }
            result.records.push(record);
        }
        Ok(result)
    }

    fn select(&self, record: &RuleRecord) -> Option<&RewriteRule> {
        self.catalogue
            .rewrite_rules()
            .iter()
            .find(|rule| rule.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classifier::classify;
    use crate::engine::validator::Validator;
    use crate::rules::builtin::builtin_scriptlets;
    use crate::rules::{HeuristicSyntaxEngine, SyntaxReport};
    use crate::types::SourceRef;

    /// Accepts everything except texts containing a given needle
    struct PickyEngine(&'static str);

    impl RuleSyntaxEngine for PickyEngine {
        fn name(&self) -> &str {
            "picky"
        }

        fn validate(&self, text: &str) -> Result<SyntaxReport, SyntaxEngineError> {
            let report = HeuristicSyntaxEngine::new().validate(text)?;
            if text.contains(self.0) {
                Ok(SyntaxReport::reject("picky engine refuses this"))
            } else {
                Ok(report)
            }
        }
    }

    fn run(
        engine: &dyn RuleSyntaxEngine,
        text: &str,
        with_scriptlets: bool,
    ) -> (RuleRecord, Vec<ImpliedScriptlet>) {
        let catalogue = Catalogue::builtin().unwrap();
        let scriptlets = builtin_scriptlets().unwrap();
        let (kind, hints) = classify(text);
        let record = RuleRecord::new(7, text, SourceRef::new("t", 1), kind, hints);
        let record = Validator::new(engine, &catalogue).validate(record).unwrap();
        Rephraser::new(engine, &catalogue, with_scriptlets.then_some(&scriptlets))
            .rephrase(record)
            .unwrap()
    }

    #[test]
    fn test_popup_rewritten_valid() {
        let (r, notices) = run(&HeuristicSyntaxEngine::new(), "||ads.example.com^$popup", true);
        assert_eq!(r.validity, Validity::RewrittenValid);
        assert_eq!(r.rewritten_text.as_deref(), Some("||ads.example.com^"));
        assert_eq!(r.original_text, "||ads.example.com^$popup");
        assert!(r.rewrite_strategy.unwrap().starts_with("strip-options"));
        assert!(r.components.options().is_empty());
        assert!(notices.is_empty());
    }

    #[test]
    fn test_no_strategy_cannot_rewrite() {
        let (r, _) = run(&HeuristicSyntaxEngine::new(), "||a.com^$csp=script-src", true);
        assert_eq!(r.validity, Validity::CannotRewrite);
        assert!(r.rewritten_text.is_none());
        assert!(r.validity_reason.contains("no rewrite strategy applies"));
    }

    #[test]
    fn test_rewrite_rejected_by_engine() {
        let (r, notices) = run(&PickyEngine("##div:has"), "example.com#?#div:-abp-has(.ad)", true);
        assert_eq!(r.validity, Validity::RewriteFailedValidation);
        assert_eq!(r.rewritten_text.as_deref(), Some("example.com##div:has(.ad)"));
        assert!(notices.is_empty());
    }

    #[test]
    fn test_alias_requires_scriptlet_catalogue() {
        let text = "example.com#%#//scriptlet('ag_json_prune', 'ads')";
        let (r, _) = run(&HeuristicSyntaxEngine::new(), text, true);
        assert_eq!(r.validity, Validity::RewrittenValid);
        assert_eq!(r.rewritten_text.as_deref(), Some("example.com##+js(json-prune, ads)"));

        let (r, _) = run(&HeuristicSyntaxEngine::new(), text, false);
        assert_eq!(r.validity, Validity::CannotRewrite);
    }

    #[test]
    fn test_implied_scriptlets_deduplicated() {
        let engine = HeuristicSyntaxEngine::new();
        let catalogue = Catalogue::builtin().unwrap();
        let scriptlets = builtin_scriptlets().unwrap();
        let validator = Validator::new(&engine, &catalogue);
        let records: Vec<RuleRecord> = [
            "a.com##div:has-text(Ad)",
            "b.com##div:has-text(Promo)",
            "c.com#$#log hi",
        ]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let (kind, hints) = classify(text);
            let record = RuleRecord::new(i as u64, *text, SourceRef::new("t", i + 1), kind, hints);
            validator.validate(record).unwrap()
        })
        .collect();

        let result = Rephraser::new(&engine, &catalogue, Some(&scriptlets))
            .rephrase_all(records)
            .unwrap();
        let names: Vec<&str> = result
            .implied_scriptlets
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["user-hideIfTextContains", "user-log"]);
        assert!(
            result
                .records
                .iter()
                .all(|r| r.validity == Validity::RewrittenValid)
        );
    }

    #[test]
    fn test_untouched_states_pass_through() {
        let (r, _) = run(&HeuristicSyntaxEngine::new(), "||plain.example.com^", true);
        assert_eq!(r.validity, Validity::Valid);
        assert!(r.rewritten_text.is_none());
    }
}
