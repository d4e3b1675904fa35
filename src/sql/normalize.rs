//! Query normalization
//!
//! Canonicalizes SQL into a signature: every literal becomes `?`, IN lists
//! collapse to `IN (?)`, whitespace runs collapse to one space, and the
//! whole string is uppercased. Two executions of the same query template
//! with different bound values produce byte-identical signatures, which is
//! what repetition detection groups on.
//!
//! The primary path runs the grammar library's tokenizer so quoted
//! strings, numbers, and placeholders are recognized exactly; if the input
//! cannot even be tokenized, a regex pass applies the same rules with
//! lower precision. Output is a fixed point: normalizing a signature
//! returns it unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

static IN_LIST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"IN\s*\(\s*\?(?:\s*,\s*\?)*\s*\)").unwrap());

static LINE_COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*").unwrap());

static BLOCK_COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static STRING_LITERAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());

static NUMBER_LITERAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(:[A-Za-z_]\w*|\$\d+)").unwrap());

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a SQL string into its signature
pub fn normalize(sql: &str) -> String {
    match tokenize_normalize(sql) {
        Some(normalized) => normalized,
        None => {
            tracing::debug!("tokenizer rejected input, normalizing via regex");
            fallback_normalize(sql)
        }
    }
}

// ============================================================================
// Token Path
// ============================================================================

fn tokenize_normalize(sql: &str) -> Option<String> {
    let tokens = Tokenizer::new(&GenericDialect {}, sql).tokenize().ok()?;

    let mut out = String::with_capacity(sql.len());
    // byte offset of a pending unary minus, so `= -5` folds into `= ?`
    let mut unary_minus_at: Option<usize> = None;
    // whether the last significant token can terminate an operand
    let mut after_operand = false;

    for token in &tokens {
        match token {
            Token::Whitespace(_) => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            Token::EOF => {}
            Token::Number(_, _)
            | Token::SingleQuotedString(_)
            | Token::DoubleQuotedString(_)
            | Token::NationalStringLiteral(_)
            | Token::EscapedStringLiteral(_)
            | Token::HexStringLiteral(_)
            | Token::Placeholder(_) => {
                if let Some(pos) = unary_minus_at.take() {
                    out.truncate(pos);
                }
                out.push('?');
                after_operand = true;
            }
            Token::Minus => {
                if after_operand {
                    unary_minus_at = None;
                } else {
                    unary_minus_at = Some(out.len());
                }
                out.push('-');
                after_operand = false;
            }
            Token::Word(word) => {
                out.push_str(&word.value.to_uppercase());
                unary_minus_at = None;
                after_operand = true;
            }
            Token::RParen => {
                out.push(')');
                unary_minus_at = None;
                after_operand = true;
            }
            other => {
                out.push_str(&other.to_string());
                unary_minus_at = None;
                after_operand = false;
            }
        }
    }

    let collapsed = IN_LIST_REGEX.replace_all(out.trim(), "IN (?)");
    Some(collapsed.into_owned())
}

// ============================================================================
// Regex Path
// ============================================================================

fn fallback_normalize(sql: &str) -> String {
    let no_comments = LINE_COMMENT_REGEX.replace_all(sql, " ");
    let no_comments = BLOCK_COMMENT_REGEX.replace_all(&no_comments, " ");
    let no_strings = STRING_LITERAL_REGEX.replace_all(&no_comments, "?");
    let no_params = PLACEHOLDER_REGEX.replace_all(&no_strings, "?");
    let no_numbers = NUMBER_LITERAL_REGEX.replace_all(&no_params, "?");
    let spaced = WHITESPACE_REGEX.replace_all(&no_numbers, " ");
    let upper = spaced.trim().to_uppercase();
    IN_LIST_REGEX.replace_all(&upper, "IN (?)").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_invariance() {
        let a = normalize("SELECT * FROM users WHERE id = 42");
        let b = normalize("SELECT * FROM users WHERE id = 99817");
        assert_eq!(a, b);
        assert_eq!(a, "SELECT * FROM USERS WHERE ID = ?");

        let c = normalize("SELECT * FROM users WHERE name = 'alice'");
        let d = normalize("SELECT * FROM users WHERE name = 'bob'");
        assert_eq!(c, d);
    }

    #[test]
    fn test_structural_sensitivity() {
        let base = normalize("SELECT * FROM users WHERE id = 1");
        assert_ne!(base, normalize("SELECT * FROM users WHERE id = 1 AND active = 1"));
        assert_ne!(base, normalize("SELECT * FROM accounts WHERE id = 1"));
        assert_ne!(
            normalize("SELECT * FROM a JOIN b ON a.id = b.a_id"),
            normalize("SELECT * FROM a LEFT JOIN b ON a.id = b.a_id")
        );
    }

    #[test]
    fn test_idempotence() {
        for sql in [
            "SELECT * FROM users WHERE id = 42",
            "select name from t where status in ('a', 'b', 'c')",
            "SELECT   *   FROM t  WHERE x = -3.5",
        ] {
            let once = normalize(sql);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_in_list_collapses_regardless_of_length() {
        let two = normalize("SELECT * FROM t WHERE id IN (1, 2)");
        let five = normalize("SELECT * FROM t WHERE id IN (1, 2, 3, 4, 5)");
        assert_eq!(two, five);
        assert!(two.contains("IN (?)"));
        // subquery IN must not collapse
        let sub = normalize("SELECT * FROM t WHERE id IN (SELECT id FROM u)");
        assert!(sub.contains("SELECT ID FROM U"));
    }

    #[test]
    fn test_whitespace_and_case_fold() {
        let normalized = normalize("select  *\n  from\tusers   where  id=7");
        assert_eq!(normalized, "SELECT * FROM USERS WHERE ID=?");
    }

    #[test]
    fn test_unary_minus_folds_into_literal() {
        assert_eq!(
            normalize("SELECT * FROM t WHERE x = -5"),
            normalize("SELECT * FROM t WHERE x = 5")
        );
        // binary minus keeps its operator
        let binary = normalize("SELECT * FROM t WHERE a - 5 > 0");
        assert!(binary.contains("A - ?"));
    }

    #[test]
    fn test_placeholder_styles_unify() {
        let positional = normalize("SELECT * FROM t WHERE id = ?");
        let dollar = normalize("SELECT * FROM t WHERE id = $1");
        assert_eq!(positional, dollar);
    }

    #[test]
    fn test_fallback_matches_token_path_contract() {
        let sql = "SELECT * FROM t WHERE a = 'x' AND b = 5";
        assert_eq!(fallback_normalize(sql), normalize(sql));
    }

    #[test]
    fn test_fallback_strips_comments() {
        let normalized = fallback_normalize(
            "SELECT * FROM t -- trailing note\nWHERE x = 3 /* inline */ AND y = 4",
        );
        assert!(!normalized.contains("TRAILING"));
        assert!(!normalized.contains("INLINE"));
        assert!(normalized.contains("X = ? AND Y = ?"));
    }

    #[test]
    fn test_garbage_input_is_deterministic() {
        let out = normalize("((( 'unterminated");
        assert_eq!(out, normalize("((( 'unterminated"));
    }
}
