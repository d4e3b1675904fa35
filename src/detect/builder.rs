//! Hand-built SQL misuse checks
//!
//! Shapes that almost always come from string-assembled query builders:
//! comparing against NULL with `=`, an IN list that collapsed to `IN ()`,
//! wildcard characters baked into a literal LIKE pattern, and named
//! placeholders left without a bound parameter.

use once_cell::sync::Lazy;
use regex::Regex;

static NULL_COMPARISON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\w.]+)\s*(=|!=|<>)\s*NULL\b").unwrap());

static EMPTY_IN_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\w.]+)\s+(?:NOT\s+)?IN\s*\(\s*\)").unwrap());

static LIKE_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIKE\s+'((?:[^']|'')*)'").unwrap());

static QUOTED_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());

// Named placeholder outside a literal. The leading class rejects `::type`
// casts and mid-word colons.
static NAMED_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^:\w]):([A-Za-z_]\w*)").unwrap());

/// One misuse found in a query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderFinding {
    /// `column = NULL` style comparison that always evaluates to NULL
    NullComparison { column: String, operator: String },
    /// `IN ()` produced by interpolating an empty collection
    EmptyInList { column: String },
    /// Unescaped `%`/`_` baked into a literal LIKE pattern
    UnescapedLikeWildcard { pattern: String },
    /// More named placeholders in the text than bound parameters
    UnboundPlaceholder { expected: usize, bound: usize },
}

impl BuilderFinding {
    /// Stable issue-type key for this finding
    pub fn kind(&self) -> &'static str {
        match self {
            BuilderFinding::NullComparison { .. } => "null_comparison",
            BuilderFinding::EmptyInList { .. } => "empty_in_list",
            BuilderFinding::UnescapedLikeWildcard { .. } => "unescaped_like_wildcard",
            BuilderFinding::UnboundPlaceholder { .. } => "unbound_placeholder",
        }
    }
}

/// Scan one query text plus its bound parameters
pub fn scan(sql: &str, params: &[serde_json::Value]) -> Vec<BuilderFinding> {
    let mut findings = Vec::new();

    for caps in NULL_COMPARISON.captures_iter(sql) {
        findings.push(BuilderFinding::NullComparison {
            column: caps[1].to_string(),
            operator: caps[2].to_string(),
        });
    }

    for caps in EMPTY_IN_LIST.captures_iter(sql) {
        findings.push(BuilderFinding::EmptyInList {
            column: caps[1].to_string(),
        });
    }

    for caps in LIKE_LITERAL.captures_iter(sql) {
        let pattern = &caps[1];
        if has_unescaped_wildcard(pattern) {
            findings.push(BuilderFinding::UnescapedLikeWildcard {
                pattern: pattern.to_string(),
            });
        }
    }

    // Named placeholders bind by name, so a name used twice needs one value
    let without_literals = QUOTED_LITERAL.replace_all(sql, "''");
    let mut names: Vec<&str> = NAMED_PLACEHOLDER
        .captures_iter(&without_literals)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    if names.len() > params.len() {
        findings.push(BuilderFinding::UnboundPlaceholder {
            expected: names.len(),
            bound: params.len(),
        });
    }

    findings
}

fn has_unescaped_wildcard(pattern: &str) -> bool {
    let mut previous = None;
    for ch in pattern.chars() {
        if (ch == '%' || ch == '_') && previous != Some('\\') {
            return true;
        }
        previous = Some(ch);
    }
    false
}
