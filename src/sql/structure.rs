//! Structural SQL extraction
//!
//! Parses a raw SQL string into a typed [`StructuralQuery`] using the
//! sqlparser grammar. When the grammar cannot parse the input, the public
//! surface degrades to the regex layer in [`super::fallback`]; a single
//! call always comes entirely from one path, never a mix of both.

use crate::error::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    Delete, Expr, FromTable, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr,
    Insert, Join, JoinConstraint, JoinOperator, ObjectName, OrderByExpr, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;

// ============================================================================
// Structural Types
// ============================================================================

/// Statement kind of the analyzed SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    #[default]
    Other,
}

/// Table reference with optional alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Join kind, with `LEFT OUTER` already folded into `Left`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn label(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

/// One JOIN clause of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// ON conditions split at top-level AND, rendered as text
    #[serde(default)]
    pub on_conditions: Vec<String>,
}

/// One leaf condition of the WHERE clause
///
/// `literal_value` holds the right-hand operand when it is a literal
/// (quoted strings without their quotes, numbers as written) or `"?"` for
/// any placeholder style; column-to-column comparisons leave it `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereCondition {
    pub column: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Typed structural view of one SQL string
///
/// Derived deterministically from the text; recomputed rather than patched
/// when the SQL changes. For non-SELECT statements the join/aggregation
/// fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralQuery {
    pub statement_kind: StatementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_table: Option<TableRef>,
    #[serde(default)]
    pub joins: Vec<JoinClause>,
    #[serde(default)]
    pub where_conditions: Vec<WhereCondition>,
    #[serde(default)]
    pub order_by_columns: Vec<String>,
    #[serde(default)]
    pub group_by_columns: Vec<String>,
    #[serde(default)]
    pub aggregation_functions: BTreeSet<String>,
    pub has_limit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_value: Option<u64>,
    pub has_offset: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_value: Option<u64>,
    pub has_distinct: bool,
    pub has_subquery: bool,
    pub has_group_by: bool,
    pub selects_all_columns: bool,
}

// ============================================================================
// Public Extraction Surface
// ============================================================================

/// Extract the structural view of a SQL string
///
/// Grammar parse first; on failure the whole result comes from the regex
/// fallback. Never panics, never errors: malformed input yields a value
/// with empty fields.
pub fn extract(sql: &str) -> StructuralQuery {
    match extract_via_ast(sql) {
        Ok(structure) => structure,
        Err(err) => {
            tracing::debug!(error = %err, "grammar parse failed, using regex fallback");
            super::fallback::extract(sql)
        }
    }
}

/// Joins of the query, `LEFT OUTER JOIN` folded to `LEFT`
pub fn extract_joins(sql: &str) -> Vec<JoinClause> {
    extract(sql).joins
}

/// The first FROM relation (or UPDATE/DELETE/INSERT target)
pub fn extract_main_table(sql: &str) -> Option<TableRef> {
    extract(sql).main_table
}

/// Column names referenced by WHERE leaf conditions
pub fn extract_where_columns(sql: &str) -> Vec<String> {
    extract(sql)
        .where_conditions
        .into_iter()
        .map(|c| c.column)
        .collect()
}

/// WHERE leaf conditions with operator and literal operand
pub fn extract_where_conditions(sql: &str) -> Vec<WhereCondition> {
    extract(sql).where_conditions
}

/// Aggregation function names (COUNT/SUM/AVG/MIN/MAX) used by the query
pub fn extract_aggregation_functions(sql: &str) -> BTreeSet<String> {
    extract(sql).aggregation_functions
}

/// Column names in ORDER BY, in clause order
pub fn extract_order_by_column_names(sql: &str) -> Vec<String> {
    extract(sql).order_by_columns
}

/// Field of `alias.field IS NOT NULL` in WHERE, if present
pub fn find_is_not_null_field_on_alias(sql: &str, alias: &str) -> Option<String> {
    extract(sql)
        .where_conditions
        .into_iter()
        .find(|c| {
            c.operator == "IS NOT NULL" && c.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias))
        })
        .map(|c| c.column)
}

/// Whether `alias` is referenced outside the JOIN clause that introduced it
///
/// Counts `alias.column` references in the full SQL and subtracts those
/// inside `exclude_join_expr` (the introducing join's ON text). Counting
/// survives formatting differences between the raw SQL and a re-rendered
/// ON expression, where substring removal would not. Used to find joins
/// whose result is never read.
pub fn is_alias_used_in_query(sql: &str, alias: &str, exclude_join_expr: Option<&str>) -> bool {
    let pattern = format!(r"(?i)\b{}\.\w+", regex::escape(alias));
    let re = match regex::Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return false,
    };
    let total = re.find_iter(sql).count();
    let excluded = exclude_join_expr
        .map(|expr| re.find_iter(expr).count())
        .unwrap_or(0);
    total > excluded
}

pub fn has_subquery(sql: &str) -> bool {
    extract(sql).has_subquery
}

pub fn has_group_by(sql: &str) -> bool {
    extract(sql).has_group_by
}

pub fn has_distinct(sql: &str) -> bool {
    extract(sql).has_distinct
}

/// Whether any LIKE pattern in the query starts with `%` or `_`
pub fn has_leading_wildcard_like(sql: &str) -> bool {
    match extract_via_ast(sql) {
        Ok(structure) => structure.where_conditions.iter().any(|c| {
            matches!(c.operator.as_str(), "LIKE" | "NOT LIKE")
                && c.literal_value
                    .as_deref()
                    .is_some_and(|p| p.starts_with('%') || p.starts_with('_'))
        }),
        Err(_) => super::fallback::has_leading_wildcard_like(sql),
    }
}

pub fn get_limit_value(sql: &str) -> Option<u64> {
    extract(sql).limit_value
}

// ============================================================================
// AST Walk (primary path)
// ============================================================================

/// Grammar-based extraction; errors trigger the regex fallback upstream
pub(crate) fn extract_via_ast(sql: &str) -> ParseResult<StructuralQuery> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)?;
    let statement = statements.first().ok_or(ParseError::EmptyStatement)?;

    let mut out = StructuralQuery::default();
    match statement {
        Statement::Query(query) => {
            out.statement_kind = StatementKind::Select;
            walk_query(query, &mut out);
        }
        Statement::Insert(insert) => {
            out.statement_kind = StatementKind::Insert;
            walk_insert(insert, &mut out);
        }
        Statement::Update {
            table, selection, ..
        } => {
            out.statement_kind = StatementKind::Update;
            out.main_table = table_ref_of(&table.relation);
            if let Some(expr) = selection {
                collect_where_conditions(expr, &mut out);
            }
        }
        Statement::Delete(delete) => {
            out.statement_kind = StatementKind::Delete;
            walk_delete(delete, &mut out);
        }
        _ => return Err(ParseError::UnsupportedStatement),
    }
    Ok(out)
}

fn walk_query(query: &Query, out: &mut StructuralQuery) {
    if let Some(select) = first_select(&query.body) {
        walk_select(select, out);
    }

    if let Some(order_by) = &query.order_by {
        for OrderByExpr { expr, .. } in &order_by.exprs {
            out.order_by_columns.push(column_name_of(expr));
        }
    }

    if let Some(limit) = &query.limit {
        out.has_limit = true;
        out.limit_value = literal_u64(limit);
    }
    if let Some(offset) = &query.offset {
        out.has_offset = true;
        out.offset_value = literal_u64(&offset.value);
    }
}

/// First SELECT of the body, descending through set operations and parens
fn first_select(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select),
        SetExpr::Query(query) => first_select(&query.body),
        SetExpr::SetOperation { left, .. } => first_select(left),
        _ => None,
    }
}

fn walk_select(select: &Select, out: &mut StructuralQuery) {
    out.has_distinct = select.distinct.is_some();

    for item in &select.projection {
        match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => {
                out.selects_all_columns = true;
            }
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                collect_aggregations(expr, &mut out.aggregation_functions);
                if contains_subquery(expr) {
                    out.has_subquery = true;
                }
            }
        }
    }

    if let Some(first) = select.from.first() {
        out.main_table = table_ref_of(&first.relation);
        if matches!(first.relation, TableFactor::Derived { .. }) {
            out.has_subquery = true;
        }
    }
    for table_with_joins in &select.from {
        collect_joins(table_with_joins, out);
    }

    if let Some(selection) = &select.selection {
        collect_where_conditions(selection, out);
    }

    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => {
            if !exprs.is_empty() {
                out.has_group_by = true;
                for expr in exprs {
                    out.group_by_columns.push(column_name_of(expr));
                }
            }
        }
        GroupByExpr::All(_) => {
            out.has_group_by = true;
        }
    }

    if let Some(having) = &select.having {
        collect_aggregations(having, &mut out.aggregation_functions);
    }
}

fn walk_insert(insert: &Insert, out: &mut StructuralQuery) {
    out.main_table = Some(TableRef {
        name: object_name_text(&insert.table_name),
        alias: None,
    });
    if let Some(source) = &insert.source {
        if first_select(&source.body).is_some_and(|s| !s.from.is_empty()) {
            out.has_subquery = true;
        }
    }
}

fn walk_delete(delete: &Delete, out: &mut StructuralQuery) {
    let tables = match &delete.from {
        FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
    };
    if let Some(first) = tables.first() {
        out.main_table = table_ref_of(&first.relation);
    }
    if let Some(selection) = &delete.selection {
        collect_where_conditions(selection, out);
    }
}

fn collect_joins(table_with_joins: &TableWithJoins, out: &mut StructuralQuery) {
    for join in &table_with_joins.joins {
        let (table, alias) = match table_ref_of(&join.relation) {
            Some(table_ref) => (table_ref.name, table_ref.alias),
            None => continue,
        };
        if matches!(join.relation, TableFactor::Derived { .. }) {
            out.has_subquery = true;
        }
        let kind = join_kind_of(join);
        let on_conditions = join_conditions_of(join);
        out.joins.push(JoinClause {
            kind,
            table,
            alias,
            on_conditions,
        });
    }
}

fn join_kind_of(join: &Join) -> JoinKind {
    match &join.join_operator {
        JoinOperator::Inner(_) => JoinKind::Inner,
        JoinOperator::LeftOuter(_) => JoinKind::Left,
        JoinOperator::RightOuter(_) => JoinKind::Right,
        JoinOperator::FullOuter(_) => JoinKind::Full,
        JoinOperator::CrossJoin => JoinKind::Cross,
        JoinOperator::LeftSemi(_) | JoinOperator::LeftAnti(_) => JoinKind::Left,
        JoinOperator::RightSemi(_) | JoinOperator::RightAnti(_) => JoinKind::Right,
        _ => JoinKind::Inner,
    }
}

fn join_conditions_of(join: &Join) -> Vec<String> {
    let constraint = match &join.join_operator {
        JoinOperator::Inner(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c) => c,
        _ => return Vec::new(),
    };
    match constraint {
        JoinConstraint::On(expr) => {
            let mut conditions = Vec::new();
            split_top_level_and(expr, &mut conditions);
            conditions
        }
        JoinConstraint::Using(columns) => columns
            .iter()
            .map(|ident| format!("USING({})", ident.value))
            .collect(),
        JoinConstraint::Natural | JoinConstraint::None => Vec::new(),
    }
}

fn split_top_level_and(expr: &Expr, into: &mut Vec<String>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: sqlparser::ast::BinaryOperator::And,
            right,
        } => {
            split_top_level_and(left, into);
            split_top_level_and(right, into);
        }
        Expr::Nested(inner) => split_top_level_and(inner, into),
        other => into.push(other.to_string()),
    }
}

fn collect_where_conditions(expr: &Expr, out: &mut StructuralQuery) {
    if contains_subquery(expr) {
        out.has_subquery = true;
    }
    collect_condition_leaves(expr, &mut out.where_conditions);
}

/// Walk AND/OR trees collecting leaf comparisons
fn collect_condition_leaves(expr: &Expr, into: &mut Vec<WhereCondition>) {
    use sqlparser::ast::BinaryOperator;

    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Xor => {
                collect_condition_leaves(left, into);
                collect_condition_leaves(right, into);
            }
            _ => {
                if let Some((alias, column)) = column_parts_of(left) {
                    into.push(WhereCondition {
                        column,
                        operator: op.to_string(),
                        literal_value: operand_literal(right),
                        alias,
                    });
                }
            }
        },
        Expr::Nested(inner) => collect_condition_leaves(inner, into),
        Expr::IsNull(inner) => {
            if let Some((alias, column)) = column_parts_of(inner) {
                into.push(WhereCondition {
                    column,
                    operator: "IS NULL".to_string(),
                    literal_value: None,
                    alias,
                });
            }
        }
        Expr::IsNotNull(inner) => {
            if let Some((alias, column)) = column_parts_of(inner) {
                into.push(WhereCondition {
                    column,
                    operator: "IS NOT NULL".to_string(),
                    literal_value: None,
                    alias,
                });
            }
        }
        Expr::InList { expr, negated, .. } => {
            if let Some((alias, column)) = column_parts_of(expr) {
                into.push(WhereCondition {
                    column,
                    operator: if *negated { "NOT IN" } else { "IN" }.to_string(),
                    literal_value: None,
                    alias,
                });
            }
        }
        Expr::InSubquery { expr, negated, .. } => {
            if let Some((alias, column)) = column_parts_of(expr) {
                into.push(WhereCondition {
                    column,
                    operator: if *negated { "NOT IN" } else { "IN" }.to_string(),
                    literal_value: None,
                    alias,
                });
            }
        }
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        }
        | Expr::ILike {
            negated,
            expr,
            pattern,
            ..
        } => {
            if let Some((alias, column)) = column_parts_of(expr) {
                into.push(WhereCondition {
                    column,
                    operator: if *negated { "NOT LIKE" } else { "LIKE" }.to_string(),
                    literal_value: operand_literal(pattern),
                    alias,
                });
            }
        }
        Expr::Between {
            expr, negated, ..
        } => {
            if let Some((alias, column)) = column_parts_of(expr) {
                into.push(WhereCondition {
                    column,
                    operator: if *negated { "NOT BETWEEN" } else { "BETWEEN" }.to_string(),
                    literal_value: None,
                    alias,
                });
            }
        }
        _ => {}
    }
}

// ============================================================================
// Expression Helpers
// ============================================================================

fn table_ref_of(relation: &TableFactor) -> Option<TableRef> {
    match relation {
        TableFactor::Table { name, alias, .. } => Some(TableRef {
            name: object_name_text(name),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        }),
        TableFactor::Derived { alias, .. } => alias.as_ref().map(|a| TableRef {
            name: a.name.value.clone(),
            alias: None,
        }),
        _ => None,
    }
}

fn object_name_text(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

/// Split a column expression into `(alias, column)`
fn column_parts_of(expr: &Expr) -> Option<(Option<String>, String)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident.value.clone())),
        Expr::CompoundIdentifier(parts) => {
            let column = parts.last()?.value.clone();
            let alias = if parts.len() > 1 {
                parts.first().map(|i| i.value.clone())
            } else {
                None
            };
            Some((alias, column))
        }
        Expr::Nested(inner) => column_parts_of(inner),
        _ => None,
    }
}

/// Literal operand as text: numbers as written, strings without quotes,
/// any placeholder style as `"?"`
fn operand_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Value(value) => match value {
            Value::Number(n, _) => Some(n.clone()),
            Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Some(s.clone()),
            Value::NationalStringLiteral(s) | Value::HexStringLiteral(s) => Some(s.clone()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Placeholder(_) => Some("?".to_string()),
            Value::Null => Some("NULL".to_string()),
            _ => None,
        },
        Expr::Nested(inner) => operand_literal(inner),
        Expr::UnaryOp { expr, .. } => operand_literal(expr),
        _ => None,
    }
}

fn literal_u64(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n.parse().ok(),
        _ => None,
    }
}

fn collect_aggregations(expr: &Expr, into: &mut BTreeSet<String>) {
    const AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

    match expr {
        Expr::Function(func) => {
            let name = object_name_text(&func.name).to_uppercase();
            if AGGREGATES.contains(&name.as_str()) {
                into.insert(name);
            }
            if let FunctionArguments::List(list) = &func.args {
                for arg in &list.args {
                    if let FunctionArg::Unnamed(FunctionArgExpr::Expr(inner))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(inner),
                        ..
                    } = arg
                    {
                        collect_aggregations(inner, into);
                    }
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_aggregations(left, into);
            collect_aggregations(right, into);
        }
        Expr::Nested(inner) | Expr::UnaryOp { expr: inner, .. } => {
            collect_aggregations(inner, into);
        }
        Expr::Cast { expr: inner, .. } => collect_aggregations(inner, into),
        _ => {}
    }
}

fn contains_subquery(expr: &Expr) -> bool {
    match expr {
        Expr::Subquery(_) | Expr::InSubquery { .. } | Expr::Exists { .. } => true,
        Expr::BinaryOp { left, right, .. } => {
            contains_subquery(left) || contains_subquery(right)
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => contains_subquery(expr),
        Expr::InList { expr, list, .. } => {
            contains_subquery(expr) || list.iter().any(contains_subquery)
        }
        Expr::Between {
            expr, low, high, ..
        } => contains_subquery(expr) || contains_subquery(low) || contains_subquery(high),
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            contains_subquery(expr) || contains_subquery(pattern)
        }
        _ => false,
    }
}

fn column_name_of(expr: &Expr) -> String {
    match column_parts_of(expr) {
        Some((_, column)) => column,
        None => expr.to_string(),
    }
}
