#![forbid(unsafe_code)]

//! Validation against the target engine
//!
//! The validator asks the [`RuleSyntaxEngine`] whether a rule parses, then
//! applies the policy [`Catalogue`] to decide whether the target would honour
//! it. It moves each active record from `Valid` to at most one other state.

use crate::config::Catalogue;
use crate::error::SyntaxEngineError;
use crate::rules::{Components, RuleRecord, RuleSyntaxEngine};
use crate::types::{RuleKind, ScriptletDialect, Validity};
use rayon::prelude::*;
use tracing::debug;

/// Validates rule records against an engine and a policy catalogue
pub struct Validator<'a> {
    engine: &'a dyn RuleSyntaxEngine,
    catalogue: &'a Catalogue,
}

impl<'a> Validator<'a> {
    pub fn new(engine: &'a dyn RuleSyntaxEngine, catalogue: &'a Catalogue) -> Self {
        Self { engine, catalogue }
    }

    /// Validates one record
    ///
    /// # Errors
    ///
    /// Only an unusable engine is an error. A rule the engine rejects is
    /// returned as `InvalidSyntax`.
    pub fn validate(&self, mut record: RuleRecord) -> Result<RuleRecord, SyntaxEngineError> {
        match record.kind {
            RuleKind::Comment | RuleKind::MetadataHeader => return Ok(record),
            RuleKind::Unknown => {
                let reason = record
                    .hints
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unrecognized line".to_string());
                record.transition(Validity::InvalidSyntax, reason);
                return Ok(record);
            }
            _ => {}
        }

        let report = self.engine.validate(&record.original_text)?;
        record.components = report.components;
        if !report.accepted {
            let reason = report
                .reason
                .unwrap_or_else(|| "rejected by syntax engine".to_string());
            record.transition(Validity::InvalidSyntax, reason);
            return Ok(record);
        }

        if let Some((next, reason)) = self.policy_verdict(&record) {
            debug!(id = record.id, validity = %next, %reason, "policy verdict");
            record.transition(next, reason);
        }
        Ok(record)
    }

    /// Validates a batch, preserving order
    pub fn validate_all(
        &self,
        records: Vec<RuleRecord>,
    ) -> Result<Vec<RuleRecord>, SyntaxEngineError> {
        records
            .into_par_iter()
            .map(|record| self.validate(record))
            .collect()
    }

    fn policy_verdict(&self, record: &RuleRecord) -> Option<(Validity, String)> {
        if let Components::Scriptlet {
            dialect: ScriptletDialect::AdGuard,
            ..
        } = record.components
        {
            return Some((
                Validity::PotentialForeignDialect,
                "AdGuard scriptlet syntax".to_string(),
            ));
        }

        if let Some(marker) = self.catalogue.foreign_marker(&record.original_text) {
            return Some((
                Validity::PotentialForeignDialect,
                format!("foreign dialect marker {marker}"),
            ));
        }

        if let Components::Network { options, .. } = &record.components {
            if let Some(option) = self.catalogue.foreign_option(options) {
                return Some((
                    Validity::PotentialForeignDialect,
                    format!("foreign option ${option}"),
                ));
            }
        }

        match &record.components {
            Components::Network { options, .. } => {
                if let Some(option) = self.catalogue.unsupported_option(options) {
                    return Some((
                        Validity::UnsupportedFeature,
                        format!("unsupported option ${option}"),
                    ));
                }
                if let Some(pattern) = self.catalogue.unsupported_option_pattern(options) {
                    return Some((
                        Validity::UnsupportedFeature,
                        format!("options match unsupported pattern {pattern}"),
                    ));
                }
            }
            Components::Cosmetic {
                selector, extended, ..
            } => {
                if *extended {
                    return Some((
                        Validity::NeedsRewriting,
                        "extended CSS separator #?#".to_string(),
                    ));
                }
                if let Some(pattern) = self.catalogue.unsupported_selector(selector) {
                    return Some((
                        Validity::UnsupportedFeature,
                        format!("selector matches unsupported pattern {pattern}"),
                    ));
                }
                if let Some(style) = self.catalogue.disallowed_style(selector) {
                    return Some((
                        Validity::UnsupportedFeature,
                        format!("unsupported :style() declaration '{style}'"),
                    ));
                }
            }
            _ => {}
        }
        None
    }
}
