#![forbid(unsafe_code)]

//! Unification and optimization of the final list
//!
//! Runs sequentially over the whole batch:
//!
//! 1. selection of accepted rules and printable comments
//! 2. deduplication on effective text (first occurrence wins)
//! 3. removal of network rules already covered by a full-domain block
//! 4. assembly: comments first, then rules, each optionally sorted

use crate::rules::grammar;
use crate::rules::{CommentStyle, Components, RuleRecord};
use crate::types::RuleKind;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Options that change what a rule does beyond blocking; such rules are
/// never treated as redundant
const SEMANTIC_OPTIONS: &[&str] = &[
    "badfilter",
    "important",
    "redirect",
    "redirect-rule",
    "removeparam",
    "csp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifierOptions {
    pub optimize: bool,
    pub sort: bool,
}

impl Default for UnifierOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            sort: true,
        }
    }
}

/// Counters collected while unifying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnifyStats {
    pub selected: usize,
    pub duplicates: usize,
    pub redundant: usize,
    pub comments: usize,
    pub rules: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unified {
    pub lines: Vec<String>,
    pub stats: UnifyStats,
}

struct Entry<'r> {
    text: String,
    components: &'r Components,
}

pub struct Unifier {
    options: UnifierOptions,
}

impl Unifier {
    pub fn new(options: UnifierOptions) -> Self {
        Self { options }
    }

    pub fn unify(&self, records: &[RuleRecord]) -> Unified {
        let mut stats = UnifyStats::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut comments = Vec::new();
        let mut rules = Vec::new();

        for record in records {
            let Some(text) = select(record) else {
                continue;
            };
            stats.selected += 1;
            if !seen.insert(text.clone()) {
                stats.duplicates += 1;
                continue;
            }
            if record.kind == RuleKind::Comment {
                comments.push(text);
            } else {
                rules.push(Entry {
                    text,
                    components: &record.components,
                });
            }
        }

        if self.options.optimize {
            let before = rules.len();
            rules = remove_redundant(rules);
            stats.redundant = before - rules.len();
        }

        let mut rules: Vec<String> = rules.into_iter().map(|e| e.text).collect();
        if self.options.sort {
            comments.sort();
            rules.sort();
        }

        stats.comments = comments.len();
        stats.rules = rules.len();
        debug!(
            selected = stats.selected,
            duplicates = stats.duplicates,
            redundant = stats.redundant,
            "unified"
        );

        let mut lines = comments;
        lines.extend(rules);
        Unified { lines, stats }
    }
}

/// The output text of a record, if it belongs in the list at all
fn select(record: &RuleRecord) -> Option<String> {
    match record.kind {
        kind if kind.is_active() => record
            .validity
            .is_accepted()
            .then(|| record.effective_text().to_string()),
        RuleKind::Comment => {
            if record.hints.discard_from_body {
                return None;
            }
            match record.hints.comment {
                Some(CommentStyle::Empty) | None => None,
                Some(CommentStyle::Hash) => {
                    let body = record.original_text.trim_start_matches('#').trim();
                    Some(if body.is_empty() {
                        "!".to_string()
                    } else {
                        format!("! {body}")
                    })
                }
                Some(CommentStyle::Bang) => Some(record.original_text.clone()),
            }
        }
        _ => None,
    }
}

/// The domain of a full-domain block: `||D^` optionally followed by
/// value-less options
///
/// A `$badfilter` rule disables its twin instead of blocking, so it never
/// counts as a block.
fn full_block(components: &Components) -> Option<String> {
    let (pattern, options) = components.blocking_network()?;
    let host = pattern.strip_prefix("||")?.strip_suffix('^')?;
    if host.is_empty() || !host.contains('.') || !host.chars().all(grammar::is_host_char) {
        return None;
    }
    let simple = options
        .iter()
        .all(|o| !o.contains('=') && grammar::option_name(o) != "badfilter");
    simple.then(|| host.to_ascii_lowercase())
}

/// Candidate for removal: a blocking network rule with a known host
struct Candidate {
    host: String,
    has_path: bool,
}

fn candidate(components: &Components) -> Option<Candidate> {
    let (pattern, options) = components.blocking_network()?;
    if options
        .iter()
        .any(|o| SEMANTIC_OPTIONS.contains(&grammar::option_name(o).as_str()))
    {
        return None;
    }
    let host = grammar::anchored_domain(pattern)?;
    let lower = pattern.to_ascii_lowercase();
    let after_host = lower
        .find(&host)
        .map_or("", |i| &lower[i + host.len()..]);
    Some(Candidate {
        has_path: after_host.contains('/'),
        host,
    })
}

fn remove_redundant(rules: Vec<Entry<'_>>) -> Vec<Entry<'_>> {
    let mut blockers: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, entry) in rules.iter().enumerate() {
        if let Some(domain) = full_block(entry.components) {
            blockers.entry(domain).or_default().push(index);
        }
    }
    if blockers.is_empty() {
        return rules;
    }

    // A block's own options never restrict what it covers
    let covered_by = |index: usize, domain: &str| {
        blockers
            .get(domain)
            .is_some_and(|list| list.iter().any(|&other| other != index))
    };

    let redundant: Vec<bool> = rules
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let Some(c) = candidate(entry.components) else {
                return false;
            };
            if c.has_path && covered_by(index, &c.host) {
                return true;
            }
            parent_domains(&c.host).any(|parent| covered_by(index, parent))
        })
        .collect();

    rules
        .into_iter()
        .zip(redundant)
        .filter_map(|(entry, drop)| {
            if drop {
                debug!(rule = %entry.text, "redundant");
                None
            } else {
                Some(entry)
            }
        })
        .collect()
}

/// Strict parent domains: `a.b.c.d` yields `b.c.d` then `c.d`
fn parent_domains(host: &str) -> impl Iterator<Item = &str> {
    host.match_indices('.')
        .map(move |(i, _)| &host[i + 1..])
        .filter(|parent| parent.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ClassifyHints, HeuristicSyntaxEngine, RuleSyntaxEngine};
    use crate::types::{SourceRef, Validity};

    fn record(id: u64, text: &str, kind: RuleKind) -> RuleRecord {
        let hints = match kind {
            RuleKind::Comment if text.is_empty() => ClassifyHints {
                comment: Some(CommentStyle::Empty),
                ..ClassifyHints::default()
            },
            RuleKind::Comment if text.starts_with('#') => ClassifyHints {
                comment: Some(CommentStyle::Hash),
                ..ClassifyHints::default()
            },
            RuleKind::Comment => ClassifyHints {
                comment: Some(CommentStyle::Bang),
                ..ClassifyHints::default()
            },
            _ => ClassifyHints::default(),
        };
        let mut r = RuleRecord::new(id, text, SourceRef::new("t", id as usize), kind, hints);
        if kind.is_active() {
            r.components = HeuristicSyntaxEngine::new().validate(text).unwrap().components;
        }
        r
    }

    fn network(id: u64, text: &str) -> RuleRecord {
        record(id, text, RuleKind::Network)
    }

    fn unify(records: &[RuleRecord], optimize: bool, sort: bool) -> Vec<String> {
        Unifier::new(UnifierOptions { optimize, sort })
            .unify(records)
            .lines
    }

    #[test]
    fn test_selection() {
        let mut invalid = network(3, "|||bad^");
        invalid.transition(Validity::InvalidSyntax, "bad");
        let header = record(4, "! Title: X", RuleKind::MetadataHeader);
        let records = vec![
            network(1, "||a.com^"),
            record(2, "", RuleKind::Comment),
            invalid,
            header,
            record(5, "! keep me", RuleKind::Comment),
            record(6, "# hosts note", RuleKind::Comment),
        ];
        assert_eq!(
            unify(&records, false, false),
            vec!["! keep me", "! hosts note", "||a.com^"]
        );
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let records = vec![
            network(1, "||b.com^"),
            network(2, "||a.com^"),
            network(3, "||b.com^"),
            record(4, "! c", RuleKind::Comment),
            record(5, "! c", RuleKind::Comment),
        ];
        let unified = Unifier::new(UnifierOptions {
            optimize: false,
            sort: false,
        })
        .unify(&records);
        assert_eq!(unified.lines, vec!["! c", "||b.com^", "||a.com^"]);
        assert_eq!(unified.stats.duplicates, 2);
    }

    #[test]
    fn test_dedup_uses_effective_text() {
        let mut rewritten = network(1, "||a.com^$popup");
        rewritten.transition(Validity::UnsupportedFeature, "popup");
        rewritten.rewritten_text = Some("||a.com^".to_string());
        rewritten.transition(Validity::RewrittenValid, "rewritten");
        let records = vec![rewritten, network(2, "||a.com^")];
        assert_eq!(unify(&records, false, true), vec!["||a.com^"]);
    }

    #[test]
    fn test_redundant_rules_removed() {
        let records = vec![
            network(1, "||ads.example.com/banner.js"),
            network(2, "||example.com^"),
            network(3, "||sub.example.com^"),
            network(4, "||deep.sub.example.com/x$image"),
            network(5, "||other.com/path"),
            network(6, "@@||sub.example.com^"),
            network(7, "||notexample.com^"),
        ];
        assert_eq!(
            unify(&records, true, false),
            vec![
                "||example.com^",
                "||other.com/path",
                "@@||sub.example.com^",
                "||notexample.com^",
            ]
        );
    }

    #[test]
    fn test_same_domain_with_path_removed() {
        let records = vec![network(1, "||a.com^"), network(2, "||a.com/ads/")];
        assert_eq!(unify(&records, true, true), vec!["||a.com^"]);
    }

    #[test]
    fn test_block_with_simple_options_covers_any_rule() {
        let records = vec![
            network(1, "||a.com^$third-party"),
            network(2, "||sub.a.com^"),
            network(3, "||x.a.com^$third-party,script"),
            network(4, "||a.com/ads^"),
        ];
        assert_eq!(unify(&records, true, false), vec!["||a.com^$third-party"]);
    }

    #[test]
    fn test_badfilter_and_valued_options_are_not_blocks() {
        let records = vec![
            network(1, "||a.com^$badfilter"),
            network(2, "||sub.a.com^"),
            network(3, "||b.com^$domain=c.com"),
            network(4, "||b.com/ads^"),
        ];
        assert_eq!(unify(&records, true, false).len(), 4);
    }

    #[test]
    fn test_full_block_never_removes_itself() {
        let records = vec![network(1, "||a.com^")];
        assert_eq!(unify(&records, true, true), vec!["||a.com^"]);
    }

    #[test]
    fn test_important_rules_kept() {
        let records = vec![network(1, "||a.com^"), network(2, "||x.a.com^$important")];
        assert_eq!(unify(&records, true, true).len(), 2);
    }

    #[test]
    fn test_optimize_off_keeps_everything() {
        let records = vec![network(1, "||a.com^"), network(2, "||sub.a.com^")];
        assert_eq!(unify(&records, false, true).len(), 2);
    }

    #[test]
    fn test_sorting_comments_then_rules() {
        let records = vec![
            network(1, "||z.com^"),
            record(2, "! b", RuleKind::Comment),
            record(3, "example.com##.ad", RuleKind::Cosmetic),
            record(4, "! a", RuleKind::Comment),
        ];
        assert_eq!(
            unify(&records, true, true),
            vec!["! a", "! b", "example.com##.ad", "||z.com^"]
        );
    }

    #[test]
    fn test_parent_domains() {
        let parents: Vec<&str> = parent_domains("a.b.c.d").collect();
        assert_eq!(parents, vec!["b.c.d", "c.d"]);
        assert_eq!(parent_domains("c.d").count(), 0);
    }
}
