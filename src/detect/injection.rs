//! Injection risk scoring
//!
//! Weighted combination of independent sub-checks over the raw SQL text.
//! Each check contributes a fixed weight so a score is reproducible and
//! each indicator can be tested in isolation:
//!
//! - numeric literal inside quotes        +1
//! - SQL injection keywords               +3
//! - comment syntax inside quoted literal +2
//! - consecutive quote characters         +2
//! - unparameterized LIKE pattern         +1
//! - literal value outside safe allowlist +1
//! - multiple literal-bearing conditions  +1
//!
//! Allowlisted status literals (`active`, `true`, ...) are ignored by the
//! literal checks so ordinary status filters score zero.

use super::is_safe_literal;
use once_cell::sync::Lazy;
use regex::Regex;

/// Stable indicator names reported in scan results
pub mod indicator {
    pub const NUMERIC_IN_QUOTES: &str = "numeric literal inside quotes";
    pub const INJECTION_KEYWORDS: &str = "SQL injection keywords";
    pub const COMMENT_IN_LITERAL: &str = "comment syntax inside quoted literal";
    pub const CONSECUTIVE_QUOTES: &str = "consecutive quote characters";
    pub const UNPARAMETERIZED_LIKE: &str = "unparameterized LIKE pattern";
    pub const UNSAFE_LITERAL: &str = "literal value outside safe allowlist";
    pub const MULTIPLE_LITERALS: &str = "multiple literal-bearing conditions";
}

static QUOTED_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").unwrap());

static NUMERIC_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-?\d+(?:\.\d+)?\s*$").unwrap());

// Keyword fragments that make sense inside an injected payload but not in
// ordinary data: stacked statements, timing probes, and OR/AND tautologies.
static INJECTION_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bunion\s+(?:all\s+)?select\b|\bdrop\s+(?:table|database)\b|\binsert\s+into\b|\bdelete\s+from\b|\bupdate\s+\w+\s+set\b|\bsleep\s*\(|\bbenchmark\s*\(|\bwaitfor\s+delay\b|\b(?:or|and)\s+\S+\s*(?:=|like\b)",
    )
    .unwrap()
});

static LIKE_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIKE\s+'((?:[^']|'')*)'").unwrap());

/// Outcome of one injection scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionScan {
    pub risk_level: u32,
    pub indicators: Vec<&'static str>,
}

impl InjectionScan {
    fn record(&mut self, name: &'static str, weight: u32) {
        self.indicators.push(name);
        self.risk_level += weight;
    }
}

/// Score `sql` for injection risk. Zero means no indicator fired.
pub fn scan(sql: &str) -> InjectionScan {
    let literals: Vec<&str> = QUOTED_LITERAL
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    let unsafe_literals: Vec<&str> = literals
        .iter()
        .copied()
        .filter(|content| !is_safe_literal(content))
        .collect();

    let mut result = InjectionScan::default();

    if unsafe_literals
        .iter()
        .any(|content| NUMERIC_CONTENT.is_match(content))
    {
        result.record(indicator::NUMERIC_IN_QUOTES, 1);
    }

    if literals
        .iter()
        .any(|content| INJECTION_KEYWORDS.is_match(content))
    {
        result.record(indicator::INJECTION_KEYWORDS, 3);
    }

    if literals
        .iter()
        .any(|content| content.contains("--") || content.contains("/*"))
    {
        result.record(indicator::COMMENT_IN_LITERAL, 2);
    }

    if literals.iter().any(|content| content.contains("''")) {
        result.record(indicator::CONSECUTIVE_QUOTES, 2);
    }

    if LIKE_LITERAL
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .any(|m| !is_safe_literal(m.as_str()))
    {
        result.record(indicator::UNPARAMETERIZED_LIKE, 1);
    }

    if !unsafe_literals.is_empty() {
        result.record(indicator::UNSAFE_LITERAL, 1);
    }

    if unsafe_literals.len() >= 2 {
        result.record(indicator::MULTIPLE_LITERALS, 1);
    }

    result
}
