#![forbid(unsafe_code)]

//! The rule syntax engine boundary
//!
//! The pipeline never decides on its own whether a rule parses. It asks a
//! [`RuleSyntaxEngine`], which answers with an acceptance flag and a
//! structured decomposition. [`HeuristicSyntaxEngine`] is the engine shipped
//! with the binary; tests and embedders can substitute their own.

use crate::error::SyntaxEngineError;
use crate::rules::grammar::{self, Marker};
use crate::rules::record::Components;
use crate::types::ScriptletDialect;
use once_cell::sync::Lazy;
use regex::Regex;

/// Answer of a syntax engine for one rule text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxReport {
    pub accepted: bool,
    pub reason: Option<String>,
    pub components: Components,
}

impl SyntaxReport {
    pub fn accept(components: Components) -> Self {
        Self {
            accepted: true,
            reason: None,
            components,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            components: Components::None,
        }
    }
}

/// Ground truth on what the target engine accepts
///
/// The trait is `Send + Sync` so stages can consult it from rayon workers.
/// An `Err` means the engine itself is unusable and aborts the run; a
/// rejected rule is an `Ok` report with `accepted == false`.
pub trait RuleSyntaxEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Checks one rule text
    fn validate(&self, text: &str) -> Result<SyntaxReport, SyntaxEngineError>;
}

static HOSTS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){3})((?:\s+[\w.-]+)+)\s*(?:#.*)?$")
        .expect("hosts regex is valid")
});

static DOMAIN_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^~?[\w*.-]+$").expect("domain regex is valid"));

static OPTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^~?[A-Za-z0-9_-]+$").expect("option regex is valid"));

/// A lenient stand-in for the target engine's parser
///
/// Accepts anything that is structurally well formed: balanced selectors,
/// closed scriptlet calls, compilable regex patterns and well-formed option
/// names. Dialect policy is left to the validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSyntaxEngine;

impl HeuristicSyntaxEngine {
    pub fn new() -> Self {
        Self
    }

    fn decompose(&self, text: &str) -> Result<Components, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty rule".to_string());
        }

        if let Some((at, marker)) = grammar::find_marker(text) {
            let domains = &text[..at];
            let body = &text[at + marker.token().len()..];
            return if marker.is_scriptlet() {
                decompose_scriptlet(domains, body, marker)
            } else {
                decompose_cosmetic(domains, body, marker)
            };
        }

        if let Some(caps) = HOSTS_LINE.captures(text) {
            return Ok(Components::Hosts {
                address: caps[1].to_string(),
                hostnames: caps[2].split_whitespace().map(str::to_string).collect(),
            });
        }

        decompose_network(text)
    }
}

impl RuleSyntaxEngine for HeuristicSyntaxEngine {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn validate(&self, text: &str) -> Result<SyntaxReport, SyntaxEngineError> {
        Ok(match self.decompose(text) {
            Ok(components) => SyntaxReport::accept(components),
            Err(reason) => SyntaxReport::reject(reason),
        })
    }
}

fn check_domains(domains: &str) -> Result<Vec<String>, String> {
    let list = grammar::split_domains(domains);
    if let Some(bad) = list.iter().find(|d| !DOMAIN_ENTRY.is_match(d)) {
        return Err(format!("invalid domain '{bad}'"));
    }
    Ok(list)
}

fn decompose_cosmetic(domains: &str, selector: &str, marker: Marker) -> Result<Components, String> {
    let domains = check_domains(domains)?;
    let selector = selector.trim();
    if selector.is_empty() {
        return Err("empty cosmetic selector".to_string());
    }
    if !grammar::is_balanced(selector) {
        return Err("unbalanced brackets or quotes in selector".to_string());
    }
    Ok(Components::Cosmetic {
        domains,
        selector: selector.to_string(),
        extended: marker.is_extended(),
        exception: marker.is_exception(),
    })
}

fn decompose_scriptlet(domains: &str, body: &str, marker: Marker) -> Result<Components, String> {
    let domains = check_domains(domains)?;
    let exception = marker.is_exception();

    if marker == Marker::AbpSnippet {
        let body = body.trim();
        let (name, arguments) = match body.find(|c: char| c == '(' || c.is_whitespace()) {
            Some(i) if body[i..].starts_with('(') => {
                let inner = &body[i + 1..];
                (&body[..i], inner.strip_suffix(')').unwrap_or(inner))
            }
            Some(i) => (&body[..i], &body[i..]),
            None => (body, ""),
        };
        if name.is_empty() {
            return Err("empty snippet call".to_string());
        }
        return Ok(Components::Scriptlet {
            domains,
            name: name.to_string(),
            arguments: arguments.trim().to_string(),
            dialect: ScriptletDialect::AbpSnippet,
            exception,
        });
    }

    let Some(call) = body.trim_end().strip_suffix(')') else {
        return Err("unterminated scriptlet call".to_string());
    };
    if !grammar::is_balanced(call) {
        return Err("unbalanced scriptlet arguments".to_string());
    }
    let mut args = grammar::split_arguments(call).into_iter();
    let name = args.next().unwrap_or_default();
    let name = grammar::unquote(&name).to_string();
    if name.is_empty() {
        return Err("missing scriptlet name".to_string());
    }
    let dialect = match marker {
        Marker::AdGuardScriptlet | Marker::AdGuardScriptletException => ScriptletDialect::AdGuard,
        _ => ScriptletDialect::UblockBrave,
    };
    Ok(Components::Scriptlet {
        domains,
        name,
        arguments: args.collect::<Vec<_>>().join(", "),
        dialect,
        exception,
    })
}

fn decompose_network(text: &str) -> Result<Components, String> {
    if text.starts_with("|||") {
        return Err("too many anchor pipes".to_string());
    }
    let parts = grammar::split_network(text);
    let pattern = parts.pattern;
    if pattern.chars().any(char::is_whitespace) {
        return Err("whitespace in network pattern".to_string());
    }

    let options: Vec<String> = match parts.options {
        Some(raw) => {
            let options = grammar::split_options(raw);
            for option in &options {
                let name = option.split_once('=').map_or(*option, |(n, _)| n);
                if !OPTION_NAME.is_match(name) {
                    return Err(format!("malformed option '{option}'"));
                }
            }
            options.into_iter().map(str::to_string).collect()
        }
        None => Vec::new(),
    };

    if pattern.is_empty() && options.is_empty() {
        return Err("empty network pattern".to_string());
    }

    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        let source = &pattern[1..pattern.len() - 1];
        if let Err(e) = Regex::new(source) {
            return Err(format!("invalid regex pattern: {e}"));
        }
    }

    Ok(Components::Network {
        pattern: pattern.to_string(),
        options,
        exception: parts.exception,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> SyntaxReport {
        HeuristicSyntaxEngine::new().validate(text).unwrap()
    }

    #[test]
    fn test_network_decomposition() {
        let report = check("@@||cdn.example.com^$script,domain=a.com|b.com");
        assert!(report.accepted);
        assert_eq!(
            report.components,
            Components::Network {
                pattern: "||cdn.example.com^".to_string(),
                options: vec!["script".to_string(), "domain=a.com|b.com".to_string()],
                exception: true,
            }
        );
    }

    #[test]
    fn test_rejects_triple_pipe() {
        let report = check("|||too_many_pipes.com^");
        assert!(!report.accepted);
        assert_eq!(report.reason.as_deref(), Some("too many anchor pipes"));
    }

    #[test]
    fn test_rejects_unbalanced_selector() {
        assert!(!check("example.com##[attr=val").accepted);
    }

    #[test]
    fn test_rejects_unterminated_scriptlet() {
        assert!(!check("example.com##+js(noClosingParen").accepted);
    }

    #[test]
    fn test_rejects_bad_regex() {
        assert!(!check("/ads(?=x)/").accepted);
        assert!(check("/ads[0-9]+/$image").accepted);
    }

    #[test]
    fn test_rejects_malformed_option() {
        assert!(!check("||a.com^$,image").accepted);
        assert!(!check("||a.com^$thi rd").accepted);
    }

    #[test]
    fn test_cosmetic_decomposition() {
        let report = check("a.com,~b.a.com#?#div:-abp-has(.ad)");
        assert_eq!(
            report.components,
            Components::Cosmetic {
                domains: vec!["a.com".to_string(), "~b.a.com".to_string()],
                selector: "div:-abp-has(.ad)".to_string(),
                extended: true,
                exception: false,
            }
        );
    }

    #[test]
    fn test_scriptlet_decomposition() {
        let report = check("example.com##+js(set-cookie, consent, true)");
        assert_eq!(
            report.components,
            Components::Scriptlet {
                domains: vec!["example.com".to_string()],
                name: "set-cookie".to_string(),
                arguments: "consent, true".to_string(),
                dialect: ScriptletDialect::UblockBrave,
                exception: false,
            }
        );

        let report = check("example.com#%#//scriptlet('ag_json_prune', 'ads')");
        match report.components {
            Components::Scriptlet { name, dialect, .. } => {
                assert_eq!(name, "ag_json_prune");
                assert_eq!(dialect, ScriptletDialect::AdGuard);
            }
            other => panic!("expected scriptlet components, got {other:?}"),
        }
    }

    #[test]
    fn test_snippet_decomposition() {
        let report = check("example.com#$#log 'hello world'");
        match report.components {
            Components::Scriptlet {
                name,
                arguments,
                dialect,
                ..
            } => {
                assert_eq!(name, "log");
                assert_eq!(arguments, "'hello world'");
                assert_eq!(dialect, ScriptletDialect::AbpSnippet);
            }
            other => panic!("expected scriptlet components, got {other:?}"),
        }
    }

    #[test]
    fn test_hosts_decomposition() {
        let report = check("0.0.0.0 ads.example.com");
        assert_eq!(
            report.components,
            Components::Hosts {
                address: "0.0.0.0".to_string(),
                hostnames: vec!["ads.example.com".to_string()],
            }
        );
    }

    #[test]
    fn test_hosts_comment_and_several_names() {
        let report = check("0.0.0.0 a.com # ads");
        assert!(report.accepted, "{:?}", report.reason);
        assert_eq!(
            report.components,
            Components::Hosts {
                address: "0.0.0.0".to_string(),
                hostnames: vec!["a.com".to_string()],
            }
        );

        let report = check("127.0.0.1\ta.com  www.a.com\t#tracker");
        assert_eq!(
            report.components,
            Components::Hosts {
                address: "127.0.0.1".to_string(),
                hostnames: vec!["a.com".to_string(), "www.a.com".to_string()],
            }
        );

        assert!(!check("0.0.0.0 a.com b.com/path").accepted);
    }

    #[test]
    fn test_empty_rule_rejected() {
        assert!(!check("   ").accepted);
    }
}
