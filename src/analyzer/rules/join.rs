//! JOIN shape analyzers
//!
//! - `wasted_join`: LEFT JOIN whose rows nothing ever reads
//! - `left_join_as_inner`: LEFT JOIN whose WHERE filter discards the
//!   NULL-extended rows anyway
//! - `excessive_joins`: more joins than one query should carry

use crate::analyzer::severity;
use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::model::{Issue, IssueCategory, Severity, Suggestion};
use crate::sql::JoinKind;
use crate::sql::structure::is_alias_used_in_query;

// ============================================================================
// wasted_join
// ============================================================================

/// LEFT JOINs whose alias is never referenced outside their own ON clause
pub struct WastedJoinAnalyzer;

impl Analyzer for WastedJoinAnalyzer {
    fn id(&self) -> &'static str {
        "wasted_join"
    }
    fn name(&self) -> &'static str {
        "Wasted JOIN detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            // SELECT * reads every joined column, so no join is unreferenced
            if structure.selects_all_columns {
                continue;
            }
            let sql = &records[0].sql;

            for join in &structure.joins {
                // INNER/CROSS joins change row multiplicity even when unread
                if join.kind != JoinKind::Left {
                    continue;
                }
                let alias = join.alias.as_deref().unwrap_or(&join.table);
                let on_text = join.on_conditions.join(" AND ");
                if is_alias_used_in_query(sql, alias, Some(&on_text)) {
                    continue;
                }

                issues.push(
                    Issue::new(
                        "wasted_join",
                        format!("LEFT JOIN on {} is never read", join.table),
                        format!(
                            "The query joins {} but no column of it is referenced outside \
                             the ON clause. The join spends execution time producing rows \
                             nothing consumes; drop it or read from it.",
                            join.table
                        ),
                        Severity::Info,
                        self.category(),
                    )
                    .with_suggestion(
                        Suggestion::new("wasted_join.remove_join")
                            .with("table", &join.table)
                            .with("alias", alias),
                    )
                    .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
                );
            }
        }
        issues
    }
}

// ============================================================================
// left_join_as_inner
// ============================================================================

/// LEFT JOINs that a WHERE condition turns into INNER JOINs
///
/// `LEFT JOIN p ... WHERE p.x IS NOT NULL` (or `WHERE p.x = ...`) discards
/// exactly the NULL-extended rows the LEFT JOIN exists to keep.
pub struct LeftJoinAsInnerAnalyzer;

impl Analyzer for LeftJoinAsInnerAnalyzer {
    fn id(&self) -> &'static str {
        "left_join_as_inner"
    }
    fn name(&self) -> &'static str {
        "LEFT JOIN filtered as INNER detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);

            for join in &structure.joins {
                if join.kind != JoinKind::Left {
                    continue;
                }
                let alias = join.alias.as_deref().unwrap_or(&join.table);
                let Some(filter) = structure.where_conditions.iter().find(|c| {
                    matches!(c.operator.as_str(), "IS NOT NULL" | "=")
                        && c.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias))
                }) else {
                    continue;
                };

                issues.push(
                    Issue::new(
                        "left_join_as_inner",
                        format!("LEFT JOIN on {} filtered like an INNER JOIN", join.table),
                        format!(
                            "WHERE {}.{} {} removes the NULL-extended rows this LEFT JOIN \
                             preserves, so the result equals an INNER JOIN. Writing INNER \
                             JOIN states the intent and lets the planner reorder freely.",
                            alias, filter.column, filter.operator
                        ),
                        Severity::Info,
                        self.category(),
                    )
                    .with_suggestion(
                        Suggestion::new("left_join_as_inner.use_inner")
                            .with("table", &join.table)
                            .with("column", &filter.column),
                    )
                    .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
                );
            }
        }
        issues
    }
}

// ============================================================================
// excessive_joins
// ============================================================================

/// Queries joining more tables than the configured ceiling
pub struct ExcessiveJoinsAnalyzer;

impl Analyzer for ExcessiveJoinsAnalyzer {
    fn id(&self) -> &'static str {
        "excessive_joins"
    }
    fn name(&self) -> &'static str {
        "Excessive JOIN count detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.excessive_joins;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let structure = ctx.structure(records[0]);
            let join_count = structure.joins.len();
            if join_count <= cfg.max_joins {
                continue;
            }
            let table = structure
                .main_table
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "this query".to_string());

            issues.push(
                Issue::new(
                    "excessive_joins",
                    format!("{} joins in one query", join_count),
                    format!(
                        "The query starting from {} joins {} tables. Planner search space \
                         grows factorially with join count; split the query or denormalize \
                         the hot path.",
                        table, join_count
                    ),
                    severity::severity_for_join_count(join_count),
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("excessive_joins.split_query")
                        .with("table", &table)
                        .with("joinCount", join_count.to_string()),
                )
                .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect()),
            );
        }
        issues
    }
}

/// JOIN analyzers in evaluation order
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(WastedJoinAnalyzer),
        Box::new(LeftJoinAsInnerAnalyzer),
        Box::new(ExcessiveJoinsAnalyzer),
    ]
}
