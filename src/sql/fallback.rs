//! Regex fallback extraction
//!
//! Best-effort structural extraction used when the grammar parser rejects
//! the input (dialect-specific syntax, truncated statements, plain
//! garbage). Same output contract as the AST path, lower precision. Every
//! function here tolerates arbitrary input and returns empty results
//! rather than failing.

use super::structure::{
    JoinClause, JoinKind, StatementKind, StructuralQuery, TableRef, WhereCondition,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static FROM_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bFROM\s+[`"]?([\w.]+)[`"]?(?:\s+(?:AS\s+)?([A-Za-z_]\w*))?"#).unwrap()
});

static UPDATE_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bUPDATE\s+[`"]?([\w.]+)[`"]?"#).unwrap());

static INSERT_TABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bINSERT\s+INTO\s+[`"]?([\w.]+)[`"]?"#).unwrap());

static JOIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(LEFT\s+OUTER|RIGHT\s+OUTER|FULL\s+OUTER|LEFT|RIGHT|FULL|INNER|CROSS)?\s*JOIN\s+[`"]?([\w.]+)[`"]?(?:\s+(?:AS\s+)?([A-Za-z_]\w*))?"#,
    )
    .unwrap()
});

static WHERE_CLAUSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bWHERE\s+(.*?)(?:\bGROUP\s+BY\b|\bORDER\s+BY\b|\bHAVING\b|\bLIMIT\b|\bOFFSET\b|;|$)")
        .unwrap()
});

static CONDITION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:([A-Za-z_]\w*)\.)?([A-Za-z_]\w*)\s*(IS\s+NOT\s+NULL|IS\s+NULL|NOT\s+LIKE|LIKE|NOT\s+IN|IN|!=|<>|<=|>=|=|<|>)\s*(\([^)]*\)|'[^']*'|[\w:?$.]+)?",
    )
    .unwrap()
});

static ORDER_BY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bORDER\s+BY\s+(.*?)(?:\bLIMIT\b|\bOFFSET\b|;|$)").unwrap()
});

static GROUP_BY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bGROUP\s+BY\s+(.*?)(?:\bORDER\s+BY\b|\bHAVING\b|\bLIMIT\b|;|$)").unwrap()
});

static AGGREGATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(COUNT|SUM|AVG|MIN|MAX)\s*\(").unwrap());

static LIMIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)(?:\s*,\s*(\d+))?").unwrap());

static OFFSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bOFFSET\s+(\d+)").unwrap());

static DISTINCT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSELECT\s+DISTINCT\b").unwrap());

static SUBQUERY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\(\s*SELECT\b").unwrap());

static SELECT_STAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSELECT\s+(?:DISTINCT\s+)?(?:\w+\.)?\*").unwrap());

static LEADING_WILDCARD_LIKE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIKE\s+'[%_]").unwrap());

static QUOTED_LITERAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^'([^']*)'$").unwrap());

/// Words that can follow a table name but are never an alias
const NON_ALIAS_KEYWORDS: [&str; 16] = [
    "ON", "USING", "WHERE", "ORDER", "GROUP", "HAVING", "LIMIT", "OFFSET", "LEFT", "RIGHT",
    "INNER", "CROSS", "FULL", "JOIN", "SET", "UNION",
];

fn is_alias_candidate(word: &str) -> bool {
    !NON_ALIAS_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(word))
}

/// Best-effort structural extraction over the raw string
pub(crate) fn extract(sql: &str) -> StructuralQuery {
    let mut out = StructuralQuery {
        statement_kind: statement_kind(sql),
        ..StructuralQuery::default()
    };

    out.main_table = main_table(sql, out.statement_kind);
    out.joins = joins(sql);
    out.where_conditions = where_conditions(sql);
    out.order_by_columns = order_by_columns(sql);
    out.group_by_columns = group_by_columns(sql);
    out.has_group_by = !out.group_by_columns.is_empty()
        || GROUP_BY_REGEX.is_match(sql);

    if out.statement_kind == StatementKind::Select {
        out.aggregation_functions = aggregation_functions(sql);
        out.has_distinct = DISTINCT_REGEX.is_match(sql);
        out.selects_all_columns = SELECT_STAR_REGEX.is_match(sql);
    }

    if let Some(captures) = LIMIT_REGEX.captures(sql) {
        out.has_limit = true;
        // MySQL `LIMIT offset, count` puts the count second
        match (captures.get(1), captures.get(2)) {
            (Some(first), Some(second)) => {
                out.limit_value = second.as_str().parse().ok();
                out.has_offset = true;
                out.offset_value = first.as_str().parse().ok();
            }
            (Some(first), None) => {
                out.limit_value = first.as_str().parse().ok();
            }
            _ => {}
        }
    }
    if let Some(captures) = OFFSET_REGEX.captures(sql) {
        out.has_offset = true;
        out.offset_value = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok());
    }

    out.has_subquery = SUBQUERY_REGEX.is_match(sql);
    out
}

fn statement_kind(sql: &str) -> StatementKind {
    let first = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase();
    match first.as_str() {
        "SELECT" => StatementKind::Select,
        "INSERT" => StatementKind::Insert,
        "UPDATE" => StatementKind::Update,
        "DELETE" => StatementKind::Delete,
        _ => StatementKind::Other,
    }
}

fn main_table(sql: &str, kind: StatementKind) -> Option<TableRef> {
    match kind {
        StatementKind::Update => UPDATE_TABLE_REGEX
            .captures(sql)
            .and_then(|c| c.get(1))
            .map(|m| TableRef {
                name: last_name_part(m.as_str()),
                alias: None,
            }),
        StatementKind::Insert => INSERT_TABLE_REGEX
            .captures(sql)
            .and_then(|c| c.get(1))
            .map(|m| TableRef {
                name: last_name_part(m.as_str()),
                alias: None,
            }),
        _ => FROM_TABLE_REGEX.captures(sql).map(|captures| {
            let name = captures
                .get(1)
                .map(|m| last_name_part(m.as_str()))
                .unwrap_or_default();
            let alias = captures
                .get(2)
                .map(|m| m.as_str())
                .filter(|w| is_alias_candidate(w))
                .map(str::to_string);
            TableRef { name, alias }
        }),
    }
}

fn joins(sql: &str) -> Vec<JoinClause> {
    JOIN_REGEX
        .captures_iter(sql)
        .map(|captures| {
            let kind = match captures
                .get(1)
                .map(|m| m.as_str().to_uppercase())
                .as_deref()
            {
                Some(k) if k.starts_with("LEFT") => JoinKind::Left,
                Some(k) if k.starts_with("RIGHT") => JoinKind::Right,
                Some(k) if k.starts_with("FULL") => JoinKind::Full,
                Some("CROSS") => JoinKind::Cross,
                _ => JoinKind::Inner,
            };
            let table = captures
                .get(2)
                .map(|m| last_name_part(m.as_str()))
                .unwrap_or_default();
            // the word after the table is only an alias when it is not a
            // keyword such as ON (historical misparse)
            let alias = captures
                .get(3)
                .map(|m| m.as_str())
                .filter(|w| is_alias_candidate(w))
                .map(str::to_string);
            JoinClause {
                kind,
                table,
                alias,
                on_conditions: Vec::new(),
            }
        })
        .collect()
}

fn where_conditions(sql: &str) -> Vec<WhereCondition> {
    let clause = match WHERE_CLAUSE_REGEX.captures(sql).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => return Vec::new(),
    };

    CONDITION_REGEX
        .captures_iter(clause)
        .filter_map(|captures| {
            let column = captures.get(2)?.as_str();
            if !is_alias_candidate(column) {
                return None;
            }
            let operator = captures
                .get(3)?
                .as_str()
                .to_uppercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let alias = captures.get(1).map(|m| m.as_str().to_string());
            let literal_value = captures
                .get(4)
                .and_then(|m| literal_text(m.as_str(), &operator));
            Some(WhereCondition {
                column: column.to_string(),
                operator,
                literal_value,
                alias,
            })
        })
        .collect()
}

fn literal_text(raw: &str, operator: &str) -> Option<String> {
    if operator.starts_with("IS") {
        return None;
    }
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(captures) = QUOTED_LITERAL_REGEX.captures(raw) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }
    if raw == "?" || raw.starts_with(':') || raw.starts_with('$') {
        return Some("?".to_string());
    }
    if raw.parse::<f64>().is_ok() {
        return Some(raw.to_string());
    }
    // remaining operands are column references or expressions
    None
}

fn order_by_columns(sql: &str) -> Vec<String> {
    column_list(ORDER_BY_REGEX.captures(sql).and_then(|c| c.get(1)))
}

fn group_by_columns(sql: &str) -> Vec<String> {
    column_list(GROUP_BY_REGEX.captures(sql).and_then(|c| c.get(1)))
}

fn column_list(clause: Option<regex::Match<'_>>) -> Vec<String> {
    let clause = match clause {
        Some(m) => m.as_str(),
        None => return Vec::new(),
    };
    clause
        .split(',')
        .filter_map(|part| {
            let word = part
                .split_whitespace()
                .next()?
                .trim_matches(|c| c == '`' || c == '"');
            if word.is_empty() {
                return None;
            }
            Some(last_name_part(word))
        })
        .collect()
}

fn aggregation_functions(sql: &str) -> BTreeSet<String> {
    AGGREGATE_REGEX
        .captures_iter(sql)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_uppercase()))
        .collect()
}

pub(crate) fn has_leading_wildcard_like(sql: &str) -> bool {
    LEADING_WILDCARD_LIKE_REGEX.is_match(sql)
}

/// `schema.table` → `table`
fn last_name_part(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}
