//! Policy catalogue: what the target engine refuses and how to convert it
//!
//! A catalogue is plain TOML. The builtin one is embedded in the binary
//! (see [`crate::rules::builtin`]); a user catalogue can extend or replace
//! it. [`CatalogueDefinition`] is the raw, mergeable form and [`Catalogue`]
//! the compiled form the validator and rephraser consult.

use crate::engine::rewrite::RewriteRule;
use crate::error::CatalogueError;
use crate::rules::grammar;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Network policy section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    /// Option names without the leading `$`
    #[serde(default)]
    pub unsupported_options: Vec<String>,

    /// Regexes matched against the whole options string
    #[serde(default)]
    pub unsupported_option_patterns: Vec<String>,
}

/// Cosmetic policy section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticPolicy {
    #[serde(default)]
    pub unsupported_selector_patterns: Vec<String>,

    /// Declaration a `:style()` selector may inject; any `:style()` is
    /// refused when unset
    #[serde(default)]
    pub allowed_style: Option<String>,
}

/// Foreign dialect markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignPolicy {
    /// Regexes matched against the whole rule text
    #[serde(default)]
    pub markers: Vec<String>,

    /// Network option names only other dialects define; matched against
    /// parsed options, never the raw text
    #[serde(default)]
    pub options: Vec<String>,
}

/// Uncompiled catalogue as written in TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueDefinition {
    #[serde(default)]
    pub network: NetworkPolicy,

    #[serde(default)]
    pub cosmetic: CosmeticPolicy,

    #[serde(default)]
    pub foreign: ForeignPolicy,

    #[serde(default)]
    pub rewrite: Vec<RewriteRule>,
}

impl CatalogueDefinition {
    /// Parse a catalogue from a TOML string
    pub fn parse(content: &str) -> Result<Self, CatalogueError> {
        toml::from_str(content).map_err(|e| CatalogueError::InvalidDefinition(e.to_string()))
    }

    /// Load a catalogue from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogueError::InvalidDefinition(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Merges `other` into this definition
    ///
    /// Lists are unioned. Table-driven rewrite rules (snippet mappings,
    /// AdGuard aliases, stripped options) are merged into the existing rule
    /// of the same strategy with `other`'s entries winning; every other
    /// rewrite rule is appended.
    pub fn extend(&mut self, other: CatalogueDefinition) {
        union(
            &mut self.network.unsupported_options,
            other.network.unsupported_options,
        );
        union(
            &mut self.network.unsupported_option_patterns,
            other.network.unsupported_option_patterns,
        );
        union(
            &mut self.cosmetic.unsupported_selector_patterns,
            other.cosmetic.unsupported_selector_patterns,
        );
        if other.cosmetic.allowed_style.is_some() {
            self.cosmetic.allowed_style = other.cosmetic.allowed_style;
        }
        union(&mut self.foreign.markers, other.foreign.markers);
        union(&mut self.foreign.options, other.foreign.options);

        'incoming: for mut rule in other.rewrite {
            for existing in &mut self.rewrite {
                match existing.absorb(rule) {
                    None => continue 'incoming,
                    Some(back) => rule = back,
                }
            }
            self.rewrite.push(rule);
        }
    }

    /// Compiles every pattern and orders rewrite rules by family
    pub fn compile(self) -> Result<Catalogue, CatalogueError> {
        let option_patterns = compile_all(&self.network.unsupported_option_patterns)?;
        let selector_patterns = compile_all(&self.cosmetic.unsupported_selector_patterns)?;
        let foreign_markers = compile_all(&self.foreign.markers)?;
        let allowed_style = self
            .cosmetic
            .allowed_style
            .as_deref()
            .map(compile_one)
            .transpose()?;

        for rule in &self.rewrite {
            rule.validate()?;
        }
        let mut rewrite = self.rewrite;
        rewrite.sort_by_key(RewriteRule::family);

        Ok(Catalogue {
            unsupported_options: self
                .network
                .unsupported_options
                .iter()
                .map(|o| grammar::option_name(o))
                .collect(),
            option_patterns,
            selector_patterns,
            allowed_style,
            foreign_markers,
            foreign_options: self
                .foreign
                .options
                .iter()
                .map(|o| grammar::option_name(o))
                .collect(),
            rewrite,
        })
    }
}

fn union(into: &mut Vec<String>, from: Vec<String>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

fn compile_one(pattern: &str) -> Result<Regex, CatalogueError> {
    Regex::new(pattern).map_err(|e| CatalogueError::InvalidRegex(format!("{pattern}: {e}")))
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, CatalogueError> {
    patterns.iter().map(|p| compile_one(p)).collect()
}

/// Compiled policy catalogue
#[derive(Debug, Clone)]
pub struct Catalogue {
    unsupported_options: Vec<String>,
    option_patterns: Vec<Regex>,
    selector_patterns: Vec<Regex>,
    allowed_style: Option<Regex>,
    foreign_markers: Vec<Regex>,
    foreign_options: Vec<String>,
    rewrite: Vec<RewriteRule>,
}

/// Counts shown by `powerlist catalogue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogueSummary {
    pub unsupported_options: usize,
    pub option_patterns: usize,
    pub selector_patterns: usize,
    pub foreign_markers: usize,
    pub foreign_options: usize,
    pub rewrite_rules: usize,
}

impl Catalogue {
    /// The catalogue compiled into the binary
    pub fn builtin() -> Result<Self, CatalogueError> {
        crate::rules::builtin::builtin_catalogue()?.compile()
    }

    /// Parse and compile a standalone catalogue
    pub fn from_toml(content: &str) -> Result<Self, CatalogueError> {
        CatalogueDefinition::parse(content)?.compile()
    }

    /// First option whose name the target refuses
    pub fn unsupported_option(&self, options: &[String]) -> Option<String> {
        options
            .iter()
            .map(|o| grammar::option_name(o))
            .find(|name| self.unsupported_options.contains(name))
    }

    /// First refused pattern matching the options string
    pub fn unsupported_option_pattern(&self, options: &[String]) -> Option<&str> {
        if options.is_empty() {
            return None;
        }
        let joined = options.join(",");
        self.option_patterns
            .iter()
            .find(|re| re.is_match(&joined))
            .map(Regex::as_str)
    }

    /// First refused pattern matching a cosmetic selector
    pub fn unsupported_selector(&self, selector: &str) -> Option<&str> {
        self.selector_patterns
            .iter()
            .find(|re| re.is_match(selector))
            .map(Regex::as_str)
    }

    /// The first `:style()` declaration the target refuses, if any
    pub fn disallowed_style<'s>(&self, selector: &'s str) -> Option<&'s str> {
        let mut rest = selector;
        let mut offset = 0;
        while let Some(call) = grammar::find_call(rest, ":style") {
            let declaration = &selector[offset + call.inner.start..offset + call.inner.end];
            let allowed = self
                .allowed_style
                .as_ref()
                .is_some_and(|re| re.is_match(declaration));
            if !allowed {
                return Some(declaration);
            }
            offset += call.span.end;
            rest = &selector[offset..];
        }
        if rest.contains(":style(") {
            // unterminated call
            return Some(rest);
        }
        None
    }

    /// First foreign-dialect marker found in the rule text
    pub fn foreign_marker(&self, text: &str) -> Option<&str> {
        self.foreign_markers
            .iter()
            .find(|re| re.is_match(text))
            .map(Regex::as_str)
    }

    /// First option whose name marks another dialect
    pub fn foreign_option(&self, options: &[String]) -> Option<String> {
        options
            .iter()
            .map(|o| grammar::option_name(o))
            .find(|name| self.foreign_options.contains(name))
    }

    /// Rewrite rules in attempt order
    pub fn rewrite_rules(&self) -> &[RewriteRule] {
        &self.rewrite
    }

    pub fn summary(&self) -> CatalogueSummary {
        CatalogueSummary {
            unsupported_options: self.unsupported_options.len(),
            option_patterns: self.option_patterns.len(),
            selector_patterns: self.selector_patterns.len(),
            foreign_markers: self.foreign_markers.len(),
            foreign_options: self.foreign_options.len(),
            rewrite_rules: self.rewrite.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rewrite::StrategyFamily;

    #[test]
    fn test_builtin_compiles() {
        let catalogue = Catalogue::builtin().unwrap();
        let summary = catalogue.summary();
        assert!(summary.unsupported_options > 0);
        assert!(summary.rewrite_rules > 0);

        let families: Vec<_> = catalogue
            .rewrite_rules()
            .iter()
            .map(RewriteRule::family)
            .collect();
        let mut sorted = families.clone();
        sorted.sort();
        assert_eq!(families, sorted);
        assert_eq!(families[0], StrategyFamily::DisruptiveOptions);
    }

    #[test]
    fn test_option_checks() {
        let catalogue = Catalogue::builtin().unwrap();
        let opts = |s: &[&str]| s.iter().map(|o| o.to_string()).collect::<Vec<_>>();

        assert_eq!(
            catalogue.unsupported_option(&opts(&["third-party", "popup"])),
            Some("popup".to_string())
        );
        assert_eq!(catalogue.unsupported_option(&opts(&["~third-party"])), None);
        assert!(
            catalogue
                .unsupported_option_pattern(&opts(&["removeparam=/^utm_/"]))
                .is_some()
        );
        assert!(
            catalogue
                .unsupported_option_pattern(&opts(&["removeparam=utm_source"]))
                .is_none()
        );
    }

    #[test]
    fn test_foreign_options_ignore_rule_text() {
        let catalogue = Catalogue::builtin().unwrap();
        let opts = |s: &[&str]| s.iter().map(|o| o.to_string()).collect::<Vec<_>>();

        assert_eq!(
            catalogue.foreign_option(&opts(&["third-party", "app=com.example"])),
            Some("app".to_string())
        );
        assert_eq!(
            catalogue.foreign_option(&opts(&["cookie=/consent/"])),
            Some("cookie".to_string())
        );
        assert_eq!(catalogue.foreign_option(&opts(&["script"])), None);
        assert!(catalogue.foreign_marker("news.com,cookielaw.org##.ad").is_none());
        assert!(
            catalogue
                .foreign_marker("example.com##+js(set-cookie,cookieConsent,1)")
                .is_none()
        );
    }

    #[test]
    fn test_style_allowance() {
        let catalogue = Catalogue::builtin().unwrap();
        assert_eq!(catalogue.disallowed_style(".ad:style(display: none !important)"), None);
        assert_eq!(
            catalogue.disallowed_style(".ad:style(color: red)"),
            Some("color: red")
        );
        assert_eq!(
            catalogue.disallowed_style(".a:style(display:none) .b:style(opacity: 0)"),
            Some("opacity: 0")
        );
        assert_eq!(catalogue.disallowed_style(".banner"), None);
    }

    #[test]
    fn test_extend_merges_tables_and_lists() {
        let mut base = CatalogueDefinition::parse(
            r#"
[network]
unsupported_options = ["popup"]

[[rewrite]]
strategy = "adguard-scriptlet"
[rewrite.aliases]
log = "log.js"
"#,
        )
        .unwrap();
        let extra = CatalogueDefinition::parse(
            r#"
[network]
unsupported_options = ["popup", "csp"]

[[rewrite]]
strategy = "adguard-scriptlet"
[rewrite.aliases]
noopjs = "noop.js"

[[rewrite]]
strategy = "xpath-to-css"
"#,
        )
        .unwrap();

        base.extend(extra);
        assert_eq!(base.network.unsupported_options, vec!["popup", "csp"]);
        assert_eq!(base.rewrite.len(), 2);
        match &base.rewrite[0] {
            RewriteRule::AdguardScriptlet { aliases } => assert_eq!(aliases.len(), 2),
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_invalid_regex_reported() {
        let err = Catalogue::from_toml(
            r#"
[foreign]
markers = ["(unclosed"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidRegex(_)));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = CatalogueDefinition::parse(
            r#"
[[rewrite]]
strategy = "teleport"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidDefinition(_)));
    }

    #[test]
    fn test_empty_rule_definition_rejected() {
        let err = Catalogue::from_toml(
            r#"
[[rewrite]]
strategy = "strip-options"
options = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("without options"));
    }
}
