#![forbid(unsafe_code)]

//! Dialect rewrite rules
//!
//! Every conversion the rephraser knows is one [`RewriteRule`] variant with a
//! precondition ([`RewriteRule::matches`]) and a transform
//! ([`RewriteRule::apply`]). Rules are data: they are deserialized from the
//! `[[rewrite]]` tables of a policy catalogue.

use crate::config::{Catalogue, ScriptletCatalogue};
use crate::error::CatalogueError;
use crate::rules::grammar;
use crate::rules::{Components, RuleRecord};
use crate::types::{RuleKind, ScriptletDialect};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scriptlet that a rewrite relies on but that is not known to exist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImpliedScriptlet {
    pub name: String,
    pub category: String,
}

/// Native target of an Adblock Plus snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetTarget {
    pub scriptlet: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "custom".to_string()
}

/// Priority band of a rewrite rule; lower bands are tried first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrategyFamily {
    DisruptiveOptions,
    ExtendedCss,
    SnippetCall,
    ForeignScriptlet,
    ForeignOption,
}

/// One dialect conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum RewriteRule {
    /// Drop network options the target engine cannot honour
    StripOptions { options: Vec<String> },
    /// Rename an extended pseudo-class to its native spelling
    PseudoToNative { pseudo: String, replacement: String },
    /// Replace a trailing text/style pseudo-class with a hiding scriptlet
    PseudoToScriptlet {
        pseudo: String,
        scriptlet: String,
        #[serde(default = "default_category")]
        category: String,
    },
    /// Translate a simple `:xpath(//tag[@id][@class])` into CSS
    XpathToCss,
    /// Turn `#?#` into `##`
    ExtendedSeparator,
    /// Map `#$#snippet args` onto `##+js(scriptlet, args)`
    SnippetCall {
        #[serde(default)]
        snippets: BTreeMap<String, SnippetTarget>,
    },
    /// Map `#%#//scriptlet('name', ...)` through an alias table
    AdguardScriptlet {
        #[serde(default)]
        aliases: BTreeMap<String, String>,
    },
    /// Drop a foreign network option such as `$app`
    StripForeignOption { option: String },
    /// Replace a foreign network option with a scriptlet injection
    OptionToScriptlet { option: String, scriptlet: String },
}

/// What a rewrite rule may consult while transforming
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub policy: &'a Catalogue,
    pub scriptlets: Option<&'a ScriptletCatalogue>,
}

/// Result of applying one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten {
        text: String,
        label: String,
        notices: Vec<ImpliedScriptlet>,
    },
    /// The precondition held but the rule could not extract what it needs
    Inapplicable(String),
}

static XPATH_SIMPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^//([A-Za-z][\w-]*|\*)(?:\[@id=['"]([^'"]+)['"]\])?(?:\[@class=['"]([^'"]+)['"]\])?$"#,
    )
    .expect("xpath regex is valid")
});

impl RewriteRule {
    pub fn family(&self) -> StrategyFamily {
        match self {
            RewriteRule::StripOptions { .. } => StrategyFamily::DisruptiveOptions,
            RewriteRule::PseudoToNative { .. }
            | RewriteRule::PseudoToScriptlet { .. }
            | RewriteRule::XpathToCss
            | RewriteRule::ExtendedSeparator => StrategyFamily::ExtendedCss,
            RewriteRule::SnippetCall { .. } => StrategyFamily::SnippetCall,
            RewriteRule::AdguardScriptlet { .. } => StrategyFamily::ForeignScriptlet,
            RewriteRule::StripForeignOption { .. } | RewriteRule::OptionToScriptlet { .. } => {
                StrategyFamily::ForeignOption
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RewriteRule::StripOptions { .. } => "strip-options",
            RewriteRule::PseudoToNative { .. } => "pseudo-to-native",
            RewriteRule::PseudoToScriptlet { .. } => "pseudo-to-scriptlet",
            RewriteRule::XpathToCss => "xpath-to-css",
            RewriteRule::ExtendedSeparator => "extended-separator",
            RewriteRule::SnippetCall { .. } => "snippet-call",
            RewriteRule::AdguardScriptlet { .. } => "adguard-scriptlet",
            RewriteRule::StripForeignOption { .. } => "strip-foreign-option",
            RewriteRule::OptionToScriptlet { .. } => "option-to-scriptlet",
        }
    }

    /// Rejects definitions that could never match anything
    pub fn validate(&self) -> Result<(), CatalogueError> {
        let invalid = |msg: String| Err(CatalogueError::InvalidDefinition(msg));
        match self {
            RewriteRule::StripOptions { options } if options.is_empty() => {
                invalid("strip-options rule without options".to_string())
            }
            RewriteRule::PseudoToNative { pseudo, replacement }
                if pseudo.is_empty() || replacement.is_empty() =>
            {
                invalid("pseudo-to-native rule needs pseudo and replacement".to_string())
            }
            RewriteRule::PseudoToScriptlet {
                pseudo, scriptlet, ..
            } if pseudo.is_empty() || scriptlet.is_empty() => {
                invalid("pseudo-to-scriptlet rule needs pseudo and scriptlet".to_string())
            }
            RewriteRule::StripForeignOption { option } if option.is_empty() => {
                invalid("strip-foreign-option rule without option".to_string())
            }
            RewriteRule::OptionToScriptlet { option, scriptlet }
                if option.is_empty() || scriptlet.is_empty() =>
            {
                invalid("option-to-scriptlet rule needs option and scriptlet".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Folds `other` into `self` when both are table-driven rules of the
    /// same strategy. Returns `other` back when they cannot be merged.
    pub(crate) fn absorb(&mut self, other: RewriteRule) -> Option<RewriteRule> {
        match (self, other) {
            (RewriteRule::SnippetCall { snippets }, RewriteRule::SnippetCall { snippets: more }) => {
                snippets.extend(more);
                None
            }
            (
                RewriteRule::AdguardScriptlet { aliases },
                RewriteRule::AdguardScriptlet { aliases: more },
            ) => {
                aliases.extend(more);
                None
            }
            (RewriteRule::StripOptions { options }, RewriteRule::StripOptions { options: more }) => {
                for option in more {
                    if !options.contains(&option) {
                        options.push(option);
                    }
                }
                None
            }
            (_, other) => Some(other),
        }
    }

    /// Precondition: does this rule claim the record?
    pub fn matches(&self, record: &RuleRecord) -> bool {
        let text = record.original_text.as_str();
        match self {
            RewriteRule::StripOptions { options } => {
                grammar::find_marker(text).is_none() && has_option(text, options)
            }
            RewriteRule::PseudoToNative { pseudo, .. }
            | RewriteRule::PseudoToScriptlet { pseudo, .. } => {
                record.kind == RuleKind::Cosmetic
                    && record
                        .components
                        .selector()
                        .is_some_and(|s| s.contains(&format!("{pseudo}(")))
            }
            RewriteRule::XpathToCss => {
                record.kind == RuleKind::Cosmetic
                    && record
                        .components
                        .selector()
                        .is_some_and(|s| s.contains(":xpath("))
            }
            RewriteRule::ExtendedSeparator => {
                record.kind == RuleKind::Cosmetic
                    && matches!(record.components, Components::Cosmetic { extended: true, .. })
            }
            RewriteRule::SnippetCall { .. } => {
                scriptlet_dialect(record) == Some(ScriptletDialect::AbpSnippet)
            }
            RewriteRule::AdguardScriptlet { .. } => {
                scriptlet_dialect(record) == Some(ScriptletDialect::AdGuard)
            }
            RewriteRule::StripForeignOption { option }
            | RewriteRule::OptionToScriptlet { option, .. } => {
                record.kind == RuleKind::Network
                    && record
                        .components
                        .options()
                        .iter()
                        .any(|o| grammar::option_name(o) == *option)
            }
        }
    }

    /// Transform: produce replacement text for a record this rule matched
    pub fn apply(&self, record: &RuleRecord, ctx: &RewriteContext<'_>) -> RewriteOutcome {
        let result: Rewrite = match self {
            RewriteRule::StripOptions { options } => {
                let names: Vec<&str> = options.iter().map(String::as_str).collect();
                strip_options(&record.original_text, &names).map(|(text, removed)| {
                    let label = format!("strip-options: removed ${}", removed.join(", $"));
                    (text, label, Vec::new())
                })
            }
            RewriteRule::PseudoToNative {
                pseudo,
                replacement,
            } => cosmetic(record).and_then(|c| {
                let selector = c
                    .selector
                    .replace(&format!("{pseudo}("), &format!("{replacement}("));
                check_policy(ctx, &selector)?;
                let label = format!("pseudo-to-native: {pseudo}() -> {replacement}()");
                Ok((c.render(&selector), label, Vec::new()))
            }),
            RewriteRule::PseudoToScriptlet {
                pseudo,
                scriptlet,
                category,
            } => cosmetic(record).and_then(|c| {
                let (base, argument) = trailing_call(c.selector, pseudo)?;
                if base.is_empty() {
                    return Err(format!("{pseudo}() needs a base selector"));
                }
                check_policy(ctx, base)?;
                let argument = serde_json::to_string(grammar::unquote(argument))
                    .map_err(|e| format!("cannot quote {pseudo}() argument: {e}"))?;
                let text = render_scriptlet(
                    c.domains,
                    c.exception,
                    scriptlet,
                    &[escape_argument(base), argument],
                );
                let label = format!("pseudo-to-scriptlet: {pseudo}() -> +js({scriptlet})");
                Ok((text, label, implied(ctx, scriptlet, category)))
            }),
            RewriteRule::XpathToCss => cosmetic(record).and_then(|c| {
                let (base, expression) = trailing_call(c.selector, ":xpath")?;
                let css = xpath_to_css(grammar::unquote(expression))?;
                let selector = if base.is_empty() {
                    css
                } else {
                    format!("{base} {css}")
                };
                check_policy(ctx, &selector)?;
                Ok((c.render(&selector), "xpath-to-css".to_string(), Vec::new()))
            }),
            RewriteRule::ExtendedSeparator => cosmetic(record).and_then(|c| {
                check_policy(ctx, c.selector)?;
                let label = "extended-separator: #?# -> ##".to_string();
                Ok((c.render(c.selector), label, Vec::new()))
            }),
            RewriteRule::SnippetCall { snippets } => {
                convert_snippet(record, snippets, ctx).map(|(text, label, notice)| {
                    (text, label, notice.into_iter().collect())
                })
            }
            RewriteRule::AdguardScriptlet { aliases } => convert_adguard(record, aliases, ctx),
            RewriteRule::StripForeignOption { option } => {
                strip_options(&record.original_text, &[option.as_str()]).map(|(text, _)| {
                    (text, format!("strip-foreign-option: removed ${option}"), Vec::new())
                })
            }
            RewriteRule::OptionToScriptlet { option, scriptlet } => {
                option_to_scriptlet(record, option, scriptlet, ctx)
            }
        };

        match result {
            Ok((text, label, notices)) => RewriteOutcome::Rewritten {
                text,
                label,
                notices,
            },
            Err(reason) => RewriteOutcome::Inapplicable(reason),
        }
    }
}

type Rewrite = Result<(String, String, Vec<ImpliedScriptlet>), String>;

fn scriptlet_dialect(record: &RuleRecord) -> Option<ScriptletDialect> {
    if record.kind != RuleKind::Scriptlet {
        return None;
    }
    match &record.components {
        Components::Scriptlet { dialect, .. } => Some(*dialect),
        _ => record.hints.dialect,
    }
}

fn has_option(text: &str, names: &[String]) -> bool {
    grammar::split_network(text).options.is_some_and(|raw| {
        grammar::split_options(raw)
            .iter()
            .any(|o| names.contains(&grammar::option_name(o)))
    })
}

/// Removes the named options from a network rule
fn strip_options(text: &str, names: &[&str]) -> Result<(String, Vec<String>), String> {
    let parts = grammar::split_network(text);
    let raw = parts.options.ok_or("rule has no options")?;

    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for option in grammar::split_options(raw) {
        let name = grammar::option_name(option);
        if names.contains(&name.as_str()) {
            removed.push(name);
        } else {
            kept.push(option);
        }
    }
    if removed.is_empty() {
        return Err("none of the options to strip are present".to_string());
    }
    if parts.pattern.is_empty() || parts.pattern == "*" {
        return Err("stripping would leave a rule matching every request".to_string());
    }

    let mut pattern = parts.pattern.to_string();
    if kept.is_empty()
        && pattern.starts_with("||")
        && !pattern[2..].contains(['^', '/', '*', '|'])
    {
        pattern.push('^');
    }
    let prefix = if parts.exception { "@@" } else { "" };
    let text = if kept.is_empty() {
        format!("{prefix}{pattern}")
    } else {
        format!("{prefix}{pattern}${}", kept.join(","))
    };
    Ok((text, removed))
}

struct CosmeticView<'a> {
    domains: &'a [String],
    selector: &'a str,
    exception: bool,
}

impl CosmeticView<'_> {
    fn render(&self, selector: &str) -> String {
        let separator = if self.exception { "#@#" } else { "##" };
        format!("{}{separator}{selector}", self.domains.join(","))
    }
}

fn cosmetic(record: &RuleRecord) -> Result<CosmeticView<'_>, String> {
    match &record.components {
        Components::Cosmetic {
            domains,
            selector,
            exception,
            ..
        } => Ok(CosmeticView {
            domains,
            selector,
            exception: *exception,
        }),
        _ => Err("record has no cosmetic decomposition".to_string()),
    }
}

/// Splits `selector` into the part before a trailing `pseudo(...)` call and
/// the call's argument
fn trailing_call<'a>(selector: &'a str, pseudo: &str) -> Result<(&'a str, &'a str), String> {
    let call = grammar::find_call(selector, pseudo)
        .ok_or_else(|| format!("unbalanced {pseudo}() argument"))?;
    if !selector[call.span.end..].trim().is_empty() {
        return Err(format!("{pseudo}() is not the last selector component"));
    }
    let base = selector[..call.span.start].trim();
    if base.ends_with(['>', '+', '~']) {
        return Err(format!("{pseudo}() follows a dangling combinator"));
    }
    let argument = selector[call.inner].trim();
    if grammar::unquote(argument).is_empty() {
        return Err(format!("{pseudo}() has an empty argument"));
    }
    Ok((base, argument))
}

fn xpath_to_css(expression: &str) -> Result<String, String> {
    let caps = XPATH_SIMPLE
        .captures(expression)
        .ok_or_else(|| format!("xpath '{expression}' has no simple CSS equivalent"))?;
    let mut css = caps[1].to_string();
    if let Some(id) = caps.get(2) {
        css.push('#');
        css.push_str(id.as_str());
    }
    if let Some(classes) = caps.get(3) {
        for class in classes.as_str().split_whitespace() {
            css.push('.');
            css.push_str(class);
        }
    }
    Ok(css)
}

/// A rewritten selector must not carry anything the target still refuses
fn check_policy(ctx: &RewriteContext<'_>, selector: &str) -> Result<(), String> {
    if let Some(pattern) = ctx.policy.unsupported_selector(selector) {
        return Err(format!("selector still matches unsupported pattern {pattern}"));
    }
    if ctx.policy.disallowed_style(selector).is_some() {
        return Err("selector still injects a disallowed style".to_string());
    }
    Ok(())
}

fn escape_argument(arg: &str) -> String {
    arg.replace(',', "\\,")
}

fn render_scriptlet(domains: &[String], exception: bool, name: &str, args: &[String]) -> String {
    let separator = if exception { "#@#+js(" } else { "##+js(" };
    let mut call = name.to_string();
    for arg in args {
        call.push_str(", ");
        call.push_str(arg);
    }
    format!("{}{separator}{call})", domains.join(","))
}

fn implied(ctx: &RewriteContext<'_>, scriptlet: &str, category: &str) -> Vec<ImpliedScriptlet> {
    let known = ctx.scriptlets.is_some_and(|s| s.contains(scriptlet));
    if known {
        Vec::new()
    } else {
        vec![ImpliedScriptlet {
            name: scriptlet.to_string(),
            category: category.to_string(),
        }]
    }
}

/// Tokenizes snippet arguments on whitespace or commas outside quotes
fn snippet_arguments(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => current.push(c),
            ('\'' | '"', None) => quote = Some(c),
            (c, None) if c.is_whitespace() || c == ',' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn convert_snippet(
    record: &RuleRecord,
    snippets: &BTreeMap<String, SnippetTarget>,
    ctx: &RewriteContext<'_>,
) -> Result<(String, String, Option<ImpliedScriptlet>), String> {
    let Components::Scriptlet {
        domains,
        name,
        arguments,
        exception,
        ..
    } = &record.components
    else {
        return Err("record has no scriptlet decomposition".to_string());
    };
    if arguments.contains(';') {
        return Err("chained snippet calls cannot map to a single scriptlet".to_string());
    }
    let target = snippets
        .get(name)
        .ok_or_else(|| format!("no native mapping for snippet '{name}'"))?;

    let args: Vec<String> = snippet_arguments(arguments)
        .iter()
        .map(|a| escape_argument(a))
        .collect();
    let text = render_scriptlet(domains, *exception, &target.scriptlet, &args);
    let label = format!("snippet-call: {name} -> +js({})", target.scriptlet);
    let notice = implied(ctx, &target.scriptlet, &target.category).pop();
    Ok((text, label, notice))
}

fn convert_adguard(
    record: &RuleRecord,
    aliases: &BTreeMap<String, String>,
    ctx: &RewriteContext<'_>,
) -> Rewrite {
    let Components::Scriptlet {
        domains,
        name,
        arguments,
        exception,
        ..
    } = &record.components
    else {
        return Err("record has no scriptlet decomposition".to_string());
    };
    let scriptlets = ctx
        .scriptlets
        .ok_or("no scriptlet metadata catalogue loaded")?;
    let target = aliases
        .get(name)
        .ok_or_else(|| format!("no alias for AdGuard scriptlet '{name}'"))?;
    if !scriptlets.contains(target) {
        return Err(format!("'{target}' is not a known native scriptlet"));
    }

    let native = target.strip_suffix(".js").unwrap_or(target);
    let args: Vec<String> = grammar::split_arguments(arguments)
        .iter()
        .map(|a| escape_argument(grammar::unquote(a)))
        .collect();
    let text = render_scriptlet(domains, *exception, native, &args);
    let label = format!("adguard-scriptlet: {name} -> +js({native})");
    Ok((text, label, Vec::new()))
}

fn option_to_scriptlet(
    record: &RuleRecord,
    option: &str,
    scriptlet: &str,
    ctx: &RewriteContext<'_>,
) -> Rewrite {
    let Components::Network {
        pattern,
        options,
        exception,
    } = &record.components
    else {
        return Err("record has no network decomposition".to_string());
    };
    let scriptlets = ctx
        .scriptlets
        .ok_or("no scriptlet metadata catalogue loaded")?;
    if !scriptlets.contains(scriptlet) {
        return Err(format!("'{scriptlet}' is not a known native scriptlet"));
    }

    let value = options
        .iter()
        .find(|o| grammar::option_name(o) == option)
        .and_then(|o| o.split_once('=').map(|(_, v)| v))
        .map(|v| v.replace("\\$", "$").replace("\\,", ","))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("${option} has no value"))?;

    let domains: Vec<String> = match grammar::anchored_domain(pattern) {
        Some(domain) => vec![domain],
        None => options
            .iter()
            .filter(|o| grammar::option_name(o) == "domain")
            .filter_map(|o| o.split_once('=').map(|(_, v)| v))
            .flat_map(|v| v.split('|'))
            .filter(|d| !d.is_empty() && !d.starts_with('~'))
            .map(str::to_string)
            .collect(),
    };
    if domains.is_empty() {
        return Err("no domain to scope the scriptlet to".to_string());
    }

    let text = render_scriptlet(&domains, *exception, scriptlet, &[escape_argument(&value)]);
    let label = format!("option-to-scriptlet: ${option} -> +js({scriptlet})");
    Ok((text, label, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ClassifyHints, HeuristicSyntaxEngine, RuleSyntaxEngine};
    use crate::types::SourceRef;

    fn record(text: &str, kind: RuleKind) -> RuleRecord {
        let mut r = RuleRecord::new(1, text, SourceRef::new("t", 1), kind, ClassifyHints::default());
        r.components = HeuristicSyntaxEngine::new().validate(text).unwrap().components;
        r
    }

    fn policy() -> Catalogue {
        Catalogue::builtin().unwrap()
    }

    fn scriptlets() -> ScriptletCatalogue {
        crate::rules::builtin::builtin_scriptlets().unwrap()
    }

    fn rewrite(rule: &RewriteRule, r: &RuleRecord, with_scriptlets: bool) -> RewriteOutcome {
        let policy = policy();
        let scriptlets = scriptlets();
        let ctx = RewriteContext {
            policy: &policy,
            scriptlets: with_scriptlets.then_some(&scriptlets),
        };
        assert!(rule.matches(r), "{} should match {}", rule.name(), r.original_text);
        rule.apply(r, &ctx)
    }

    fn text_of(outcome: RewriteOutcome) -> String {
        match outcome {
            RewriteOutcome::Rewritten { text, .. } => text,
            RewriteOutcome::Inapplicable(reason) => panic!("inapplicable: {reason}"),
        }
    }

    #[test]
    fn test_strip_popup() {
        let rule = RewriteRule::StripOptions {
            options: vec!["popup".to_string(), "popunder".to_string()],
        };
        let r = record("||ads.example.com^$popup", RuleKind::Network);
        assert_eq!(text_of(rewrite(&rule, &r, true)), "||ads.example.com^");

        let r = record("||ads.example.com^$third-party,popup", RuleKind::Network);
        assert_eq!(text_of(rewrite(&rule, &r, true)), "||ads.example.com^$third-party");

        let r = record("||ads.example.com$popunder", RuleKind::Network);
        assert_eq!(text_of(rewrite(&rule, &r, true)), "||ads.example.com^");
    }

    #[test]
    fn test_strip_refuses_to_broaden() {
        let rule = RewriteRule::StripOptions {
            options: vec!["popup".to_string()],
        };
        let r = record("*$popup,domain=example.com", RuleKind::Network);
        assert!(matches!(rewrite(&rule, &r, true), RewriteOutcome::Inapplicable(_)));
    }

    #[test]
    fn test_pseudo_to_native() {
        let rule = RewriteRule::PseudoToNative {
            pseudo: ":-abp-has".to_string(),
            replacement: ":has".to_string(),
        };
        let r = record("example.com#?#div:-abp-has(.sponsored)", RuleKind::Cosmetic);
        assert_eq!(text_of(rewrite(&rule, &r, true)), "example.com##div:has(.sponsored)");
    }

    #[test]
    fn test_has_text_to_scriptlet_with_notice() {
        let rule = RewriteRule::PseudoToScriptlet {
            pseudo: ":has-text".to_string(),
            scriptlet: "user-hideIfTextContains".to_string(),
            category: "cosmetic_helper".to_string(),
        };
        let r = record("example.com##div.card:has-text(Sponsored)", RuleKind::Cosmetic);
        match rewrite(&rule, &r, true) {
            RewriteOutcome::Rewritten { text, notices, .. } => {
                assert_eq!(
                    text,
                    "example.com##+js(user-hideIfTextContains, div.card, \"Sponsored\")"
                );
                assert_eq!(
                    notices,
                    vec![ImpliedScriptlet {
                        name: "user-hideIfTextContains".to_string(),
                        category: "cosmetic_helper".to_string(),
                    }]
                );
            }
            other => panic!("expected rewrite, got {other:?}"),
        }
    }

    #[test]
    fn test_pseudo_in_middle_is_inapplicable() {
        let rule = RewriteRule::PseudoToScriptlet {
            pseudo: ":has-text".to_string(),
            scriptlet: "user-hideIfTextContains".to_string(),
            category: "cosmetic_helper".to_string(),
        };
        let r = record("example.com##div:has-text(Ad) > span", RuleKind::Cosmetic);
        assert!(matches!(rewrite(&rule, &r, true), RewriteOutcome::Inapplicable(_)));

        let r = record("example.com##:has-text(Ad)", RuleKind::Cosmetic);
        assert!(matches!(rewrite(&rule, &r, true), RewriteOutcome::Inapplicable(_)));
    }

    #[test]
    fn test_xpath_to_css() {
        let r = record(
            "example.com##:xpath(//div[@id='banner'][@class='ad wide'])",
            RuleKind::Cosmetic,
        );
        assert_eq!(
            text_of(rewrite(&RewriteRule::XpathToCss, &r, true)),
            "example.com##div#banner.ad.wide"
        );

        let r = record("example.com##:xpath(//div[contains(text(),'x')])", RuleKind::Cosmetic);
        assert!(matches!(
            rewrite(&RewriteRule::XpathToCss, &r, true),
            RewriteOutcome::Inapplicable(_)
        ));
    }

    #[test]
    fn test_extended_separator_checks_policy() {
        let r = record("example.com#?#.banner", RuleKind::Cosmetic);
        assert_eq!(
            text_of(rewrite(&RewriteRule::ExtendedSeparator, &r, true)),
            "example.com##.banner"
        );

        let r = record("example.com#?#div:matches-css(width: 300px)", RuleKind::Cosmetic);
        assert!(matches!(
            rewrite(&RewriteRule::ExtendedSeparator, &r, true),
            RewriteOutcome::Inapplicable(_)
        ));
    }

    #[test]
    fn test_snippet_call() {
        let mut snippets = BTreeMap::new();
        snippets.insert(
            "log".to_string(),
            SnippetTarget {
                scriptlet: "user-log".to_string(),
                category: "utility".to_string(),
            },
        );
        let rule = RewriteRule::SnippetCall { snippets };

        let r = record("example.com#$#log 'hello, world' 2", RuleKind::Scriptlet);
        match rewrite(&rule, &r, true) {
            RewriteOutcome::Rewritten { text, notices, .. } => {
                assert_eq!(text, "example.com##+js(user-log, hello\\, world, 2)");
                assert_eq!(notices.len(), 1);
            }
            other => panic!("expected rewrite, got {other:?}"),
        }

        let r = record("example.com#$#abort-on-property-write x", RuleKind::Scriptlet);
        assert!(matches!(rewrite(&rule, &r, true), RewriteOutcome::Inapplicable(_)));
    }

    #[test]
    fn test_adguard_scriptlet_requires_catalogue() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ag_json_prune".to_string(), "json-prune.js".to_string());
        let rule = RewriteRule::AdguardScriptlet { aliases };
        let r = record(
            "example.com#%#//scriptlet('ag_json_prune', 'ads.*', 'x')",
            RuleKind::Scriptlet,
        );

        assert_eq!(
            text_of(rewrite(&rule, &r, true)),
            "example.com##+js(json-prune, ads.*, x)"
        );
        assert!(matches!(rewrite(&rule, &r, false), RewriteOutcome::Inapplicable(_)));
    }

    #[test]
    fn test_strip_app_option() {
        let rule = RewriteRule::StripForeignOption {
            option: "app".to_string(),
        };
        let r = record("||tracker.example^$app=com.example.app,third-party", RuleKind::Network);
        assert_eq!(text_of(rewrite(&rule, &r, true)), "||tracker.example^$third-party");
    }

    #[test]
    fn test_jsonprune_to_scriptlet() {
        let rule = RewriteRule::OptionToScriptlet {
            option: "jsonprune".to_string(),
            scriptlet: "json-prune".to_string(),
        };
        let r = record("||video.example.com^$jsonprune=\\$..ads", RuleKind::Network);
        assert_eq!(
            text_of(rewrite(&rule, &r, true)),
            "video.example.com##+js(json-prune, $..ads)"
        );
        assert!(matches!(rewrite(&rule, &r, false), RewriteOutcome::Inapplicable(_)));
    }

    #[test]
    fn test_family_order() {
        assert!(StrategyFamily::DisruptiveOptions < StrategyFamily::ExtendedCss);
        assert!(StrategyFamily::SnippetCall < StrategyFamily::ForeignScriptlet);
        assert!(StrategyFamily::ForeignScriptlet < StrategyFamily::ForeignOption);
    }

    #[test]
    fn test_absorb_merges_alias_tables() {
        let mut a = RewriteRule::AdguardScriptlet {
            aliases: BTreeMap::from([("a".to_string(), "x.js".to_string())]),
        };
        let b = RewriteRule::AdguardScriptlet {
            aliases: BTreeMap::from([("b".to_string(), "y.js".to_string())]),
        };
        assert!(a.absorb(b).is_none());
        match &a {
            RewriteRule::AdguardScriptlet { aliases } => assert_eq!(aliases.len(), 2),
            other => panic!("unexpected rule {other:?}"),
        }

        let mut xpath = RewriteRule::XpathToCss;
        assert!(xpath.absorb(RewriteRule::ExtendedSeparator).is_some());
    }

    #[test]
    fn test_deserialize_tagged_rules() {
        let rules: BTreeMap<String, Vec<RewriteRule>> = toml::from_str(
            r#"
[[rewrite]]
strategy = "xpath-to-css"

[[rewrite]]
strategy = "option-to-scriptlet"
option = "jsonprune"
scriptlet = "json-prune"
"#,
        )
        .unwrap();
        assert_eq!(rules["rewrite"][0], RewriteRule::XpathToCss);
        assert_eq!(rules["rewrite"][1].family(), StrategyFamily::ForeignOption);
    }
}
