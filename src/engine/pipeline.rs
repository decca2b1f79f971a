#![forbid(unsafe_code)]

//! End-to-end curation pipeline
//!
//! [`Pipeline`] owns everything a run needs (the syntax engine, the compiled
//! policy catalogue, the optional scriptlet metadata and unifier options) and
//! drives the stages strictly forward:
//! classify, validate, rephrase, unify.

use crate::config::{Catalogue, ScriptletCatalogue};
use crate::engine::classifier;
use crate::engine::rephraser::{RephraseResult, Rephraser};
use crate::engine::rewrite::ImpliedScriptlet;
use crate::engine::unifier::{Unifier, UnifierOptions, UnifyStats};
use crate::engine::validator::Validator;
use crate::error::PowerlistError;
use crate::rules::{RuleRecord, RuleSyntaxEngine};
use crate::types::{ListSource, Validity};
use std::sync::Arc;
use tracing::info;

/// Number of records per validity state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityCounts([usize; Validity::ALL.len()]);

impl ValidityCounts {
    /// Counts active records only; comments and headers have no disposition
    pub fn from_records(records: &[RuleRecord]) -> Self {
        let mut counts = Self::default();
        let disposed = records
            .iter()
            .filter(|r| r.kind.is_active() || r.validity != Validity::Valid);
        for record in disposed {
            counts.0[index_of(record.validity)] += 1;
        }
        counts
    }

    pub fn get(&self, validity: Validity) -> usize {
        self.0[index_of(validity)]
    }

    /// Every state with its count, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Validity, usize)> + '_ {
        Validity::ALL.iter().map(|v| (*v, self.get(*v)))
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

fn index_of(validity: Validity) -> usize {
    Validity::ALL
        .iter()
        .position(|v| *v == validity)
        .unwrap_or_default()
}

/// Statistics of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub sources: usize,
    pub records: usize,
    pub validity: ValidityCounts,
    pub unify: UnifyStats,
}

/// Everything a run produces
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Final list body, in output order
    pub lines: Vec<String>,
    /// Every record with its final disposition, in input order
    pub records: Vec<RuleRecord>,
    pub implied_scriptlets: Vec<ImpliedScriptlet>,
    pub stats: PipelineStats,
}

pub struct Pipeline {
    engine: Arc<dyn RuleSyntaxEngine>,
    catalogue: Arc<Catalogue>,
    scriptlets: Option<Arc<ScriptletCatalogue>>,
    options: UnifierOptions,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn RuleSyntaxEngine>, catalogue: Catalogue) -> Self {
        Self {
            engine,
            catalogue: Arc::new(catalogue),
            scriptlets: None,
            options: UnifierOptions::default(),
        }
    }

    pub fn with_scriptlets(mut self, scriptlets: Option<ScriptletCatalogue>) -> Self {
        self.scriptlets = scriptlets.map(Arc::new);
        self
    }

    pub fn with_options(mut self, options: UnifierOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs every stage over the ordered sources
    ///
    /// # Errors
    ///
    /// Fails only when the syntax engine cannot be consulted. Rules the
    /// engine rejects are reported through their validity instead.
    pub fn run(&self, sources: &[ListSource]) -> Result<PipelineOutput, PowerlistError> {
        let RephraseResult {
            records,
            implied_scriptlets,
        } = self.process(sources)?;

        let unified = Unifier::new(self.options).unify(&records);
        info!(
            lines = unified.lines.len(),
            duplicates = unified.stats.duplicates,
            redundant = unified.stats.redundant,
            "unified list"
        );

        let stats = PipelineStats {
            sources: sources.len(),
            records: records.len(),
            validity: ValidityCounts::from_records(&records),
            unify: unified.stats,
        };
        Ok(PipelineOutput {
            lines: unified.lines,
            records,
            implied_scriptlets,
            stats,
        })
    }

    /// Classifies, validates and rephrases without unifying
    pub fn process(
        &self,
        sources: &[ListSource],
    ) -> Result<RephraseResult, PowerlistError> {
        let records = classifier::ingest(sources);
        info!(
            sources = sources.len(),
            records = records.len(),
            engine = self.engine.name(),
            "classified"
        );

        let validator = Validator::new(self.engine.as_ref(), &self.catalogue);
        let records = validator.validate_all(records)?;
        let flagged = records.iter().filter(|r| r.validity.wants_rewrite()).count();
        info!(flagged, "validated");

        let rephraser = Rephraser::new(
            self.engine.as_ref(),
            &self.catalogue,
            self.scriptlets.as_deref(),
        );
        let result = rephraser.rephrase_all(records)?;
        let rewritten = result
            .records
            .iter()
            .filter(|r| r.validity == Validity::RewrittenValid)
            .count();
        info!(
            rewritten,
            implied_scriptlets = result.implied_scriptlets.len(),
            "rephrased"
        );
        Ok(result)
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }
}
