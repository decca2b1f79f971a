#![forbid(unsafe_code)]

//! Human-readable summaries on a colour-capable terminal

use crate::engine::{PipelineStats, ValidityCounts};
use crate::rules::RuleRecord;
use crate::types::Validity;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub struct HumanFormatter {
    choice: ColorChoice,
}

impl HumanFormatter {
    pub fn new(choice: ColorChoice) -> Self {
        Self { choice }
    }

    /// Prints a build summary to stderr
    pub fn print_build(&self, stats: &PipelineStats, output: &str) -> io::Result<()> {
        let mut stream = StandardStream::stderr(self.choice);
        write_build(&mut stream, stats, output)
    }

    /// Prints per-rule dispositions and counts to stderr
    pub fn print_check(&self, records: &[RuleRecord]) -> io::Result<()> {
        let mut stream = StandardStream::stderr(self.choice);
        write_check(&mut stream, records)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

fn colour_of(validity: Validity) -> Color {
    match validity {
        Validity::Valid | Validity::RewrittenValid => Color::Green,
        Validity::NeedsRewriting
        | Validity::PotentialForeignDialect
        | Validity::UnsupportedFeature => Color::Yellow,
        _ => Color::Red,
    }
}

pub fn write_build(
    out: &mut impl WriteColor,
    stats: &PipelineStats,
    output: &str,
) -> io::Result<()> {
    writeln!(
        out,
        "Processed {} records from {} sources",
        stats.records, stats.sources
    )?;
    write_counts(out, &stats.validity)?;
    writeln!(
        out,
        "  removed {} duplicates and {} redundant rules",
        stats.unify.duplicates, stats.unify.redundant
    )?;
    writeln!(out)?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(out, "Build OK")?;
    out.reset()?;
    writeln!(
        out,
        ": {} rules and {} comments written to {}",
        stats.unify.rules, stats.unify.comments, output
    )
}

pub fn write_check(out: &mut impl WriteColor, records: &[RuleRecord]) -> io::Result<()> {
    for record in records {
        if record.validity.is_accepted() && record.rewritten_text.is_none() {
            continue;
        }
        out.set_color(ColorSpec::new().set_fg(Some(colour_of(record.validity))))?;
        write!(out, "{}", record.validity)?;
        out.reset()?;
        write!(out, ": {} {}", record.source_ref, record.original_text)?;
        if let Some(rewritten) = &record.rewritten_text {
            write!(out, " -> {}", rewritten)?;
        }
        if record.validity_reason.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, " ({})", record.validity_reason)?;
        }
    }
    writeln!(out)?;
    writeln!(out, "Results:")?;
    write_counts(out, &ValidityCounts::from_records(records))
}

fn write_counts(out: &mut impl WriteColor, counts: &ValidityCounts) -> io::Result<()> {
    for (validity, count) in counts.iter().filter(|(_, count)| *count > 0) {
        write!(out, "  ")?;
        out.set_color(ColorSpec::new().set_fg(Some(colour_of(validity))))?;
        write!(out, "{:<26}", validity.as_str())?;
        out.reset()?;
        writeln!(out, "{}", count)?;
    }
    Ok(())
}
