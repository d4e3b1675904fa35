//! Per-query efficiency analyzers
//!
//! Each one inspects the structural view of a signature group and flags
//! one wasteful shape:
//! - `slow_query`: execution time over the configured threshold
//! - `select_star`: every column fetched
//! - `unbounded_result`: SELECT with no LIMIT, WHERE, or aggregation
//! - `leading_wildcard_like`: LIKE patterns no index can serve
//! - `offset_pagination`: deep OFFSET scans
//! - `missing_index`: many rows examined behind a filter or sort

use crate::analyzer::severity;
use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::model::{Issue, IssueCategory, QueryRecord, Severity, Suggestion};
use crate::sql::{StatementKind, StructuralQuery};

// ============================================================================
// slow_query
// ============================================================================

/// Queries over the latency threshold, one issue per signature
pub struct SlowQueryAnalyzer;

impl Analyzer for SlowQueryAnalyzer {
    fn id(&self) -> &'static str {
        "slow_query"
    }
    fn name(&self) -> &'static str {
        "Slow query detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.slow_query;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let slow: Vec<&QueryRecord> = records
                .iter()
                .copied()
                .filter(|r| {
                    r.execution_time_ms > cfg.threshold_ms
                        && !severity::should_suppress_slow_query(r.execution_time_ms)
                })
                .collect();
            if slow.is_empty() {
                continue;
            }

            let trigger = slowest_of(&slow);
            let total_ms: f64 = slow.iter().map(|r| r.execution_time_ms).sum();
            let structure = ctx.structure(trigger);
            let title = match &structure.main_table {
                Some(table) => format!("Slow query on {} ({:.1}ms)", table.name, trigger.execution_time_ms),
                None => format!("Slow query ({:.1}ms)", trigger.execution_time_ms),
            };

            let mut suggestion = Suggestion::new("slow_query.examine_plan")
                .with("maxTimeMs", format!("{:.2}", trigger.execution_time_ms));
            if let Some(table) = &structure.main_table {
                suggestion = suggestion.with("table", &table.name);
            }

            let mut issue = Issue::new(
                "slow_query",
                title,
                format!(
                    "{} execution(s) of this query exceeded {:.1}ms (slowest {:.2}ms, total \
                     {:.2}ms). Examine the execution plan for full scans and filesorts.",
                    slow.len(),
                    cfg.threshold_ms,
                    trigger.execution_time_ms,
                    total_ms
                ),
                severity::severity_for_slow_query(trigger.execution_time_ms),
                self.category(),
            )
            .with_suggestion(suggestion)
            .with_origin_queries(slow.iter().map(|r| r.sql.clone()).collect());
            if let Some(frames) = &trigger.backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }
        issues
    }
}

fn slowest_of<'a>(records: &[&'a QueryRecord]) -> &'a QueryRecord {
    let mut best = records[0];
    for record in &records[1..] {
        if record.execution_time_ms > best.execution_time_ms {
            best = record;
        }
    }
    best
}

// ============================================================================
// select_star
// ============================================================================

/// `SELECT *` signatures; always informational
pub struct SelectStarAnalyzer;

impl Analyzer for SelectStarAnalyzer {
    fn id(&self) -> &'static str {
        "select_star"
    }
    fn name(&self) -> &'static str {
        "SELECT * detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            if !structure.selects_all_columns {
                continue;
            }
            let Some(table) = &structure.main_table else {
                continue;
            };

            issues.push(
                Issue::new(
                    "select_star",
                    format!("SELECT * from {}", table.name),
                    format!(
                        "{} execution(s) fetch every column of {}. Select the columns the \
                         code actually reads; wide rows inflate IO and hydration cost.",
                        records.len(),
                        table.name
                    ),
                    Severity::Info,
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("select_star.explicit_columns").with("table", &table.name),
                )
                .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
            );
        }
        issues
    }
}

// ============================================================================
// unbounded_result
// ============================================================================

/// SELECT with no LIMIT, no WHERE and no aggregation: the whole table
pub struct UnboundedResultAnalyzer;

impl Analyzer for UnboundedResultAnalyzer {
    fn id(&self) -> &'static str {
        "unbounded_result"
    }
    fn name(&self) -> &'static str {
        "Unbounded result set detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.unbounded_result;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            if structure.statement_kind != StatementKind::Select
                || structure.has_limit
                || !structure.where_conditions.is_empty()
                || !structure.aggregation_functions.is_empty()
            {
                continue;
            }
            let Some(table) = &structure.main_table else {
                continue;
            };

            let max_rows = records.iter().filter_map(|r| r.row_count).max();
            let rank = match max_rows {
                Some(rows) if rows > cfg.max_rows => Severity::Warning,
                _ => Severity::Info,
            };
            let observed = match max_rows {
                Some(rows) => format!("returned up to {} rows", rows),
                None => "has no row bound".to_string(),
            };

            issues.push(
                Issue::new(
                    "unbounded_result",
                    format!("Unbounded result set from {}", table.name),
                    format!(
                        "This query reads {} without a LIMIT or filter and {}. Result size \
                         grows with the table; add a LIMIT or a WHERE clause.",
                        table.name, observed
                    ),
                    rank,
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("unbounded_result.add_limit").with("table", &table.name),
                )
                .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
            );
        }
        issues
    }
}

// ============================================================================
// leading_wildcard_like
// ============================================================================

/// `LIKE '%...'` patterns, which no btree index can serve
pub struct LeadingWildcardLikeAnalyzer;

impl Analyzer for LeadingWildcardLikeAnalyzer {
    fn id(&self) -> &'static str {
        "leading_wildcard_like"
    }
    fn name(&self) -> &'static str {
        "Leading-wildcard LIKE detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            if !has_leading_wildcard(&structure) {
                continue;
            }
            let table = structure
                .main_table
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "this table".to_string());

            // rows examined, when recorded, show the scan this pattern forces
            let scan_evidence = records
                .iter()
                .filter(|r| r.examined_rows.is_some())
                .max_by_key(|r| r.examined_rows.unwrap_or(0));
            let rank = match scan_evidence {
                Some(record) => severity::severity_for_missing_index(
                    record.examined_rows.unwrap_or(0),
                    record.execution_time_ms,
                ),
                None => Severity::Info,
            };

            issues.push(
                Issue::new(
                    "leading_wildcard_like",
                    format!("Leading-wildcard LIKE on {}", table),
                    format!(
                        "{} execution(s) filter {} with a LIKE pattern starting with a \
                         wildcard, which cannot use an index and scans every row. Anchor the \
                         pattern or use a full-text index.",
                        records.len(),
                        table
                    ),
                    rank,
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("leading_wildcard_like.fulltext").with("table", &table),
                )
                .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
            );
        }
        issues
    }
}

fn has_leading_wildcard(structure: &StructuralQuery) -> bool {
    structure.where_conditions.iter().any(|condition| {
        matches!(condition.operator.as_str(), "LIKE" | "NOT LIKE")
            && condition
                .literal_value
                .as_deref()
                .is_some_and(|pattern| pattern.starts_with('%') || pattern.starts_with('_'))
    })
}

// ============================================================================
// offset_pagination
// ============================================================================

/// Deep OFFSET pagination: the server walks and discards `offset` rows
pub struct OffsetPaginationAnalyzer;

impl Analyzer for OffsetPaginationAnalyzer {
    fn id(&self) -> &'static str {
        "offset_pagination"
    }
    fn name(&self) -> &'static str {
        "Deep OFFSET pagination detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.offset_pagination;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            let Some(offset) = structure.offset_value else {
                continue;
            };
            if offset <= cfg.max_offset {
                continue;
            }
            let table = structure
                .main_table
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "this table".to_string());

            issues.push(
                Issue::new(
                    "offset_pagination",
                    format!("Deep OFFSET pagination ({} rows skipped)", offset),
                    format!(
                        "Paging through {} with OFFSET {} makes the server produce and \
                         discard every skipped row on each page. Keyset pagination (WHERE \
                         key > last_seen) stays flat as pages deepen.",
                        table, offset
                    ),
                    Severity::Warning,
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("offset_pagination.keyset")
                        .with("table", &table)
                        .with("offset", offset.to_string()),
                )
                .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
            );
        }
        issues
    }
}

// ============================================================================
// missing_index
// ============================================================================

/// Filters or sorts that examined far more rows than an index would
pub struct MissingIndexAnalyzer;

impl Analyzer for MissingIndexAnalyzer {
    fn id(&self) -> &'static str {
        "missing_index"
    }
    fn name(&self) -> &'static str {
        "Missing index detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.missing_index;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            if structure.where_conditions.is_empty() && structure.order_by_columns.is_empty() {
                continue;
            }
            let Some(table) = &structure.main_table else {
                continue;
            };

            let candidates: Vec<&QueryRecord> = records
                .iter()
                .copied()
                .filter(|r| r.examined_rows.is_some_and(|rows| rows > cfg.min_rows_scanned))
                .collect();
            let Some(trigger) = candidates
                .iter()
                .copied()
                .max_by_key(|r| r.examined_rows.unwrap_or(0))
            else {
                continue;
            };
            let examined = trigger.examined_rows.unwrap_or(0);

            let mut columns: Vec<String> = Vec::new();
            for column in structure
                .where_conditions
                .iter()
                .map(|c| &c.column)
                .chain(structure.order_by_columns.iter())
            {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
            let column_list = columns.join(", ");

            let mut issue = Issue::new(
                "missing_index",
                format!("Possible missing index on {}", table.name),
                format!(
                    "Up to {} rows of {} were examined per execution (slowest {:.2}ms) to \
                     serve a filter/sort on {}. An index on those columns would avoid the \
                     scan.",
                    examined, table.name, trigger.execution_time_ms, column_list
                ),
                severity::severity_for_missing_index(examined, trigger.execution_time_ms),
                self.category(),
            )
            .with_suggestion(
                Suggestion::new("missing_index.add_index")
                    .with("table", &table.name)
                    .with("columns", column_list.clone()),
            )
            .with_origin_queries(candidates.iter().map(|r| r.sql.clone()).collect());
            if let Some(frames) = &trigger.backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }
        issues
    }
}

/// Efficiency analyzers in evaluation order
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(SlowQueryAnalyzer),
        Box::new(SelectStarAnalyzer),
        Box::new(UnboundedResultAnalyzer),
        Box::new(LeadingWildcardLikeAnalyzer),
        Box::new(OffsetPaginationAnalyzer),
        Box::new(MissingIndexAnalyzer),
    ]
}
