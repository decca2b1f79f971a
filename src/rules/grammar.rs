#![forbid(unsafe_code)]

//! Lexical helpers shared by the classifier, the syntax engine and the
//! rewrite rules
//!
//! Nothing here decides whether a rule is acceptable. These functions only
//! locate markers and split rules into their textual parts.

use std::ops::Range;

/// A separator that splits a rule into a domain list and a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `##+js(`
    Scriptlet,
    /// `#@#+js(`
    ScriptletException,
    /// `#%#//scriptlet(`
    AdGuardScriptlet,
    /// `#@%#//scriptlet(`
    AdGuardScriptletException,
    /// `#$#`
    AbpSnippet,
    /// `#?#`
    Extended,
    /// `#@?#`
    ExtendedException,
    /// `#@#`
    Exception,
    /// `##`
    Hide,
}

impl Marker {
    /// Candidates in matching order: longer tokens shadow their prefixes
    const CANDIDATES: [Marker; 9] = [
        Marker::AdGuardScriptletException,
        Marker::AdGuardScriptlet,
        Marker::ScriptletException,
        Marker::Scriptlet,
        Marker::ExtendedException,
        Marker::Extended,
        Marker::Exception,
        Marker::AbpSnippet,
        Marker::Hide,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Marker::Scriptlet => "##+js(",
            Marker::ScriptletException => "#@#+js(",
            Marker::AdGuardScriptlet => "#%#//scriptlet(",
            Marker::AdGuardScriptletException => "#@%#//scriptlet(",
            Marker::AbpSnippet => "#$#",
            Marker::Extended => "#?#",
            Marker::ExtendedException => "#@?#",
            Marker::Exception => "#@#",
            Marker::Hide => "##",
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Marker::ScriptletException
                | Marker::AdGuardScriptletException
                | Marker::ExtendedException
                | Marker::Exception
        )
    }

    pub fn is_scriptlet(&self) -> bool {
        matches!(
            self,
            Marker::Scriptlet
                | Marker::ScriptletException
                | Marker::AdGuardScriptlet
                | Marker::AdGuardScriptletException
                | Marker::AbpSnippet
        )
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Marker::Extended | Marker::ExtendedException)
    }
}

/// Finds the leftmost cosmetic or scriptlet marker in `text`
///
/// Returns the byte offset of the marker and which marker it is.
pub fn find_marker(text: &str) -> Option<(usize, Marker)> {
    text.match_indices('#').find_map(|(idx, _)| {
        let rest = &text[idx..];
        Marker::CANDIDATES
            .iter()
            .find(|m| rest.starts_with(m.token()))
            .map(|m| (idx, *m))
    })
}

/// Textual parts of a network rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParts<'a> {
    pub exception: bool,
    pub pattern: &'a str,
    pub options: Option<&'a str>,
}

/// Splits a network rule into exception flag, pattern and options string
///
/// For regex patterns (`/.../`) the options begin after the closing slash;
/// otherwise at the first unescaped `$`.
pub fn split_network(text: &str) -> NetworkParts<'_> {
    let (exception, body) = match text.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let split_at = if body.starts_with('/') && body.len() > 1 {
        body.rfind("/$").filter(|&i| i > 0).map(|i| i + 1)
    } else {
        first_unescaped(body, '$')
    };

    match split_at {
        Some(i) => NetworkParts {
            exception,
            pattern: &body[..i],
            options: Some(&body[i + 1..]),
        },
        None => NetworkParts {
            exception,
            pattern: body,
            options: None,
        },
    }
}

/// Splits an options string on unescaped commas
pub fn split_options(options: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in options.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(options[start..i].trim());
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(options[start..].trim());
    parts
}

/// Normalized name of a network option: lowercase, no `~`, no value
pub fn option_name(option: &str) -> String {
    let option = option.trim().trim_start_matches('~');
    let name = option.split_once('=').map_or(option, |(name, _)| name);
    name.trim().to_ascii_lowercase()
}

/// Characters allowed in a hostname
pub fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// The host a network pattern is anchored to, lowercased
///
/// Understands `||host`, `|scheme://host` and bare `host` patterns. Returns
/// `None` when the pattern does not pin down a single host.
pub fn anchored_domain(pattern: &str) -> Option<String> {
    let (rest, terminators): (&str, &[char]) = if let Some(rest) = pattern.strip_prefix("||") {
        (rest, &['^', '/', ':', '$'])
    } else if let Some(rest) = pattern.strip_prefix('|') {
        let lower = rest.to_ascii_lowercase();
        let scheme = ["https://", "http://"]
            .into_iter()
            .find(|s| lower.starts_with(s))?;
        (&rest[scheme.len()..], &['^', '/', ':', '|'])
    } else {
        let bare = pattern.strip_prefix("*.").unwrap_or(pattern);
        let bare = bare.strip_suffix('^').unwrap_or(bare);
        let labels: Vec<&str> = bare.split('.').collect();
        let well_formed = labels.len() > 1
            && labels
                .iter()
                .all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')));
        return well_formed.then(|| bare.to_ascii_lowercase());
    };

    let end = rest.find(|c: char| !is_host_char(c)).unwrap_or(rest.len());
    let host = &rest[..end];
    let next = rest[end..].chars().next();
    let terminated = next.is_none_or(|c| terminators.contains(&c));
    (!host.is_empty() && host.contains('.') && terminated).then(|| host.to_ascii_lowercase())
}

/// Splits a comma-separated domain list, dropping empty entries
pub fn split_domains(domains: &str) -> Vec<String> {
    domains
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// A located call such as `:has-text(...)` with balanced parentheses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Byte range of the whole call, name included
    pub span: Range<usize>,
    /// Byte range of the text between the parentheses
    pub inner: Range<usize>,
}

/// Locates `name(` in `haystack` and its matching closing parenthesis
///
/// `name` is given without the opening parenthesis. Quoted text inside the
/// call does not count towards nesting.
pub fn find_call(haystack: &str, name: &str) -> Option<Call> {
    let opener = format!("{name}(");
    let start = haystack.find(&opener)?;
    let inner_start = start + opener.len();
    let close = matching_paren(&haystack[inner_start..])?;
    Some(Call {
        span: start..inner_start + close + 1,
        inner: inner_start..inner_start + close,
    })
}

/// Offset of the `)` closing an already-opened parenthesis
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('\'' | '"', None) => quote = Some(c),
            ('(', None) => depth += 1,
            (')', None) if depth == 0 => return Some(i),
            (')', None) => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Splits scriptlet arguments on commas outside quotes and parentheses
pub fn split_arguments(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;
    for c in args.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => {
                current.push(c);
                escaped = true;
            }
            (q, Some(open)) if q == open => {
                current.push(c);
                quote = None;
            }
            ('\'' | '"', None) => {
                current.push(c);
                quote = Some(c);
            }
            ('(', None) => {
                current.push(c);
                depth += 1;
            }
            (')', None) => {
                current.push(c);
                depth = depth.saturating_sub(1);
            }
            (',', None) if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Strips one pair of matching surrounding quotes
pub fn unquote(arg: &str) -> &str {
    let arg = arg.trim();
    for q in ['\'', '"'] {
        if arg.len() >= 2 && arg.starts_with(q) && arg.ends_with(q) {
            return &arg[1..arg.len() - 1];
        }
    }
    arg
}

/// Checks that brackets, parentheses and quotes in `text` are balanced
pub fn is_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('\'' | '"', None) => quote = Some(c),
            ('(' | '[', None) => stack.push(c),
            (')', None) => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            (']', None) => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && quote.is_none()
}

fn first_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
}
