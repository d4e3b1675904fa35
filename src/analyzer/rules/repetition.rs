//! Repetition analyzers
//!
//! The same query shape executed many times in one trace. Groups come
//! from the normalized signature, so literal values never split a group;
//! shape detectors then route each group to the right issue type:
//! - FK lookups at or above the N+1 threshold: `n_plus_one`
//! - PK lookups: `lazy_loading`
//! - anything else repeated: `repeated_query`
//! - identical text and params: `duplicate_query`
//! - paginated FK lookups: `partial_collection_load`

use crate::analyzer::severity;
use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::detect;
use crate::model::{Issue, IssueCategory, QueryRecord, Severity, Suggestion};
use std::collections::BTreeMap;

// ============================================================================
// n_plus_one
// ============================================================================

/// Repeated query shapes, routed by FK/PK lookup detection
///
/// Repetition alone is reportable from `repetition_floor` occurrences on,
/// independent of speed. A fast query repeated a hundred times is a
/// structural problem even when no single execution is slow.
pub struct NPlusOneAnalyzer;

impl Analyzer for NPlusOneAnalyzer {
    fn id(&self) -> &'static str {
        "n_plus_one"
    }
    fn name(&self) -> &'static str {
        "N+1 query detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.n_plus_one;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let count = records.len();
            if count < cfg.repetition_floor || severity::should_suppress_repetition(count) {
                continue;
            }

            let total_ms: f64 = records.iter().map(|r| r.execution_time_ms).sum();
            let structure = ctx.structure(records[0]);
            let rank = severity::severity_for_n_plus_one(count, total_ms);

            let mut issue = if let Some(lookup) = detect::detect_n_plus_one_pattern(&structure) {
                if count >= cfg.threshold {
                    Issue::new(
                        "n_plus_one",
                        format!("N+1 query pattern on {}", lookup.table),
                        format!(
                            "{} single-row lookups by {} on {} (total {:.2}ms). Each parent \
                             row triggers its own query; fetch the association with a JOIN or \
                             one batched IN query.",
                            count, lookup.foreign_key_column, lookup.table, total_ms
                        ),
                        rank,
                        self.category(),
                    )
                    .with_suggestion(
                        Suggestion::new("n_plus_one.eager_join")
                            .with("table", &lookup.table)
                            .with("foreignKey", &lookup.foreign_key_column)
                            .with("count", count.to_string()),
                    )
                } else {
                    repeated_query_issue(self.category(), count, total_ms, rank)
                }
            } else if let Some(table) = detect::detect_lazy_loading_pattern(&structure) {
                Issue::new(
                    "lazy_loading",
                    format!("Repeated single-entity loads from {}", table),
                    format!(
                        "{} primary-key lookups on {} in one trace (total {:.2}ms). This is \
                         the lazy-loading shape; eager-fetch the association or preload the \
                         entities in one query.",
                        count, table, total_ms
                    ),
                    rank,
                    self.category(),
                )
                .with_suggestion(
                    Suggestion::new("lazy_loading.eager_fetch")
                        .with("table", table)
                        .with("count", count.to_string()),
                )
            } else {
                repeated_query_issue(self.category(), count, total_ms, rank)
            };

            issue = issue.with_origin_queries(records.iter().map(|r| r.sql.clone()).collect());
            if let Some(frames) = &records[0].backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }

        issues
    }
}

fn repeated_query_issue(
    category: IssueCategory,
    count: usize,
    total_ms: f64,
    rank: Severity,
) -> Issue {
    Issue::new(
        "repeated_query",
        format!("Query repeated {} times", count),
        format!(
            "The same query shape ran {} times in one trace (total {:.2}ms). Repetition at \
             this level usually means a loop issuing one query per item.",
            count, total_ms
        ),
        rank,
        category,
    )
    .with_suggestion(Suggestion::new("repeated_query.batch").with("count", count.to_string()))
}

// ============================================================================
// duplicate_query
// ============================================================================

/// Byte-identical SQL with identical bound parameters executed repeatedly
pub struct DuplicateQueryAnalyzer;

impl Analyzer for DuplicateQueryAnalyzer {
    fn id(&self) -> &'static str {
        "duplicate_query"
    }
    fn name(&self) -> &'static str {
        "Duplicate query detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.duplicate_query;
        let mut groups: BTreeMap<(&str, String), Vec<&QueryRecord>> = BTreeMap::new();
        for record in ctx.trace.iter() {
            let params = serde_json::to_string(&record.params).unwrap_or_default();
            groups
                .entry((record.sql.as_str(), params))
                .or_default()
                .push(record);
        }

        let mut issues = Vec::new();
        for records in groups.into_values() {
            let count = records.len();
            if count < cfg.threshold || severity::should_suppress_duplicate(count) {
                continue;
            }
            let total_ms: f64 = records.iter().map(|r| r.execution_time_ms).sum();

            let mut issue = Issue::new(
                "duplicate_query",
                format!("Identical query executed {} times", count),
                format!(
                    "The exact same SQL with the same bound parameters ran {} times (total \
                     {:.2}ms). The first result could be reused for the rest of the request.",
                    count, total_ms
                ),
                severity::severity_for_n_plus_one(count, total_ms),
                self.category(),
            )
            .with_suggestion(
                Suggestion::new("duplicate_query.memoize").with("count", count.to_string()),
            )
            .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect());
            if let Some(frames) = &records[0].backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }
        issues
    }
}

// ============================================================================
// partial_collection
// ============================================================================

/// FK lookups with a LIMIT, repeated: a collection sliced once per parent
pub struct PartialCollectionAnalyzer;

impl Analyzer for PartialCollectionAnalyzer {
    fn id(&self) -> &'static str {
        "partial_collection"
    }
    fn name(&self) -> &'static str {
        "Partial collection load detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Performance
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.partial_collection;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let count = records.len();
            if count < cfg.threshold {
                continue;
            }
            let structure = ctx.structure(records[0]);
            if !detect::detect_partial_collection_load(&structure) {
                continue;
            }
            let Some(lookup) = detect::detect_n_plus_one_pattern(&structure) else {
                continue;
            };

            let total_ms: f64 = records.iter().map(|r| r.execution_time_ms).sum();
            let mut issue = Issue::new(
                "partial_collection_load",
                format!("Partial collection loads from {}", lookup.table),
                format!(
                    "{} paginated lookups of the same collection by {} (a LIMIT slice per \
                     parent, total {:.2}ms). Fetch the needed window across parents in one \
                     query instead of slicing per parent.",
                    count, lookup.foreign_key_column, total_ms
                ),
                severity::severity_for_n_plus_one(count, total_ms),
                self.category(),
            )
            .with_suggestion(
                Suggestion::new("partial_collection.batch_window")
                    .with("table", &lookup.table)
                    .with("foreignKey", &lookup.foreign_key_column),
            )
            .with_origin_queries(records.iter().map(|r| r.sql.clone()).collect());
            if let Some(frames) = &records[0].backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }
        issues
    }
}

/// Repetition analyzers in evaluation order
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(NPlusOneAnalyzer),
        Box::new(DuplicateQueryAnalyzer),
        Box::new(PartialCollectionAnalyzer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::model::{BacktraceFrame, QueryTrace};
    use crate::sql::SqlCache;

    fn run(analyzer: &dyn Analyzer, trace: &QueryTrace) -> Vec<Issue> {
        let config = AnalysisConfig::default();
        let cache = SqlCache::new(256);
        let ctx = AnalyzerContext::new(trace, &[], &config, &cache);
        analyzer.analyze(&ctx)
    }

    fn pk_lookup_trace(count: usize) -> QueryTrace {
        (0..count)
            .map(|i| {
                QueryRecord::new("SELECT * FROM users WHERE id = ?", 0.27)
                    .with_params(vec![serde_json::json!(i)])
            })
            .collect()
    }

    #[test]
    fn test_eleven_fast_pk_lookups_are_reported() {
        let issues = run(&NPlusOneAnalyzer, &pk_lookup_trace(11));
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.issue_type, "lazy_loading");
        // count 11 crosses the warning boundary even though total time
        // stays below 3ms
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.origin_queries.len(), 11);
    }

    #[test]
    fn test_two_repetitions_are_suppressed() {
        let issues = run(&NPlusOneAnalyzer, &pk_lookup_trace(2));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_three_repetitions_cross_the_floor() {
        let issues = run(&NPlusOneAnalyzer, &pk_lookup_trace(3));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_fk_lookups_at_threshold_become_n_plus_one() {
        let trace: QueryTrace = (0..6)
            .map(|i| {
                QueryRecord::new(
                    format!("SELECT * FROM comments WHERE post_id = {}", i),
                    0.4,
                )
            })
            .collect();
        let issues = run(&NPlusOneAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "n_plus_one");
        assert!(issues[0].title.contains("comments"));
        assert_eq!(issues[0].origin_queries.len(), 6);
        let suggestion = issues[0].suggestion.as_ref().unwrap();
        assert_eq!(suggestion.template_key, "n_plus_one.eager_join");
        assert_eq!(
            suggestion.context.get("foreignKey").map(String::as_str),
            Some("post_id")
        );
    }

    #[test]
    fn test_fk_lookups_below_threshold_are_repeated_query() {
        let trace: QueryTrace = (0..4)
            .map(|i| {
                QueryRecord::new(
                    format!("SELECT * FROM comments WHERE post_id = {}", i),
                    0.4,
                )
            })
            .collect();
        let issues = run(&NPlusOneAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "repeated_query");
    }

    #[test]
    fn test_total_time_drives_severity() {
        let trace: QueryTrace = (0..5)
            .map(|i| {
                QueryRecord::new(
                    format!("SELECT * FROM comments WHERE post_id = {}", i),
                    25.0,
                )
            })
            .collect();
        let issues = run(&NPlusOneAnalyzer, &trace);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_groups_are_independent() {
        let mut trace = pk_lookup_trace(4);
        trace.push(QueryRecord::new("SELECT * FROM settings", 0.1));
        trace.push(QueryRecord::new("SELECT * FROM settings", 0.1));
        let issues = run(&NPlusOneAnalyzer, &trace);
        // the 2-element settings group stays under the floor
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "lazy_loading");
    }

    #[test]
    fn test_backtrace_inherited_from_first_record() {
        let frames = vec![BacktraceFrame::new("src/report.rs", 41, "load_rows")];
        let mut trace = QueryTrace::new();
        for i in 0..3 {
            let mut record = QueryRecord::new("SELECT * FROM users WHERE id = ?", 0.2)
                .with_params(vec![serde_json::json!(i)]);
            if i == 0 {
                record = record.with_backtrace(frames.clone());
            }
            trace.push(record);
        }
        let issues = run(&NPlusOneAnalyzer, &trace);
        assert_eq!(issues[0].backtrace.as_deref(), Some(frames.as_slice()));
    }

    #[test]
    fn test_duplicate_query_needs_identical_params() {
        let mut trace = QueryTrace::new();
        for _ in 0..3 {
            trace.push(
                QueryRecord::new("SELECT * FROM users WHERE id = ?", 0.3)
                    .with_params(vec![serde_json::json!(7)]),
            );
        }
        trace.push(
            QueryRecord::new("SELECT * FROM users WHERE id = ?", 0.3)
                .with_params(vec![serde_json::json!(8)]),
        );
        let issues = run(&DuplicateQueryAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "duplicate_query");
        assert_eq!(issues[0].origin_queries.len(), 3);
    }

    #[test]
    fn test_single_execution_is_not_a_duplicate() {
        let trace = QueryTrace::from_iter([QueryRecord::new("SELECT * FROM users", 0.3)]);
        assert!(run(&DuplicateQueryAnalyzer, &trace).is_empty());
    }

    #[test]
    fn test_partial_collection_load() {
        let trace: QueryTrace = (0..3)
            .map(|i| {
                QueryRecord::new(
                    format!("SELECT * FROM comments WHERE post_id = {} LIMIT 10", i),
                    0.6,
                )
            })
            .collect();
        let issues = run(&PartialCollectionAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "partial_collection_load");
        assert!(issues[0].title.contains("comments"));
    }

    #[test]
    fn test_unpaginated_fk_lookups_are_not_partial_loads() {
        let trace: QueryTrace = (0..3)
            .map(|i| {
                QueryRecord::new(format!("SELECT * FROM comments WHERE post_id = {}", i), 0.6)
            })
            .collect();
        assert!(run(&PartialCollectionAnalyzer, &trace).is_empty());
    }
}
