//! String-built SQL analyzers
//!
//! `injection_risk` scores literal content against the injection
//! indicator list; `builder_misuse` turns the shape findings of
//! [`crate::detect::builder`] into issues.

use crate::analyzer::severity;
use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::detect::{builder, injection};
use crate::model::{Issue, IssueCategory, QueryRecord, Suggestion};

// ============================================================================
// injection_risk
// ============================================================================

/// Literal content that looks like interpolated, possibly hostile input
pub struct InjectionRiskAnalyzer;

impl Analyzer for InjectionRiskAnalyzer {
    fn id(&self) -> &'static str {
        "injection_risk"
    }
    fn name(&self) -> &'static str {
        "SQL injection risk scoring"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Security
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let cfg = &ctx.config.injection_risk;
        let mut issues = Vec::new();

        for records in ctx.group_by_signature().into_values() {
            let mut flagged: Vec<(&QueryRecord, injection::InjectionScan)> = Vec::new();
            for record in records {
                let scan = injection::scan(&record.sql);
                if scan.risk_level < cfg.min_risk_level
                    || severity::should_suppress_injection(scan.risk_level)
                {
                    continue;
                }
                flagged.push((record, scan));
            }
            let origins: Vec<String> = flagged.iter().map(|(r, _)| r.sql.clone()).collect();
            // highest risk wins; sql text breaks ties so input order never matters
            let Some((trigger, top)) = flagged.into_iter().max_by(|a, b| {
                a.1.risk_level
                    .cmp(&b.1.risk_level)
                    .then_with(|| a.0.sql.cmp(&b.0.sql))
            }) else {
                continue;
            };

            let structure = ctx.structure(trigger);
            let title = match &structure.main_table {
                Some(table) => format!("Injection risk in query on {}", table.name),
                None => "Injection risk in string-built SQL".to_string(),
            };

            let mut issue = Issue::new(
                "injection_risk",
                title,
                format!(
                    "Literal values in this query score risk level {}: {}. Values \
                     concatenated into SQL text reach the server unchecked; bind them as \
                     parameters instead.",
                    top.risk_level,
                    top.indicators.join(", ")
                ),
                severity::severity_for_injection(top.risk_level),
                self.category(),
            )
            .with_suggestion(
                Suggestion::new("injection_risk.parameterize")
                    .with("riskLevel", top.risk_level.to_string()),
            )
            .with_origin_queries(origins);
            if let Some(frames) = &trigger.backtrace {
                issue = issue.with_backtrace(frames.clone());
            }
            issues.push(issue);
        }
        issues
    }
}

// ============================================================================
// builder_misuse
// ============================================================================

/// Query-builder output shapes that are wrong regardless of input
pub struct BuilderMisuseAnalyzer;

impl Analyzer for BuilderMisuseAnalyzer {
    fn id(&self) -> &'static str {
        "builder_misuse"
    }
    fn name(&self) -> &'static str {
        "Query builder misuse detection"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Security
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for record in ctx.trace.iter() {
            for finding in builder::scan(&record.sql, &record.params) {
                let mut issue = issue_for(&finding).with_origin_query(record.sql.clone());
                if let Some(frames) = &record.backtrace {
                    issue = issue.with_backtrace(frames.clone());
                }
                issues.push(issue);
            }
        }
        issues
    }
}

fn issue_for(finding: &builder::BuilderFinding) -> Issue {
    use builder::BuilderFinding::*;

    let rank = severity::severity_for_builder_misuse(finding);
    match finding {
        NullComparison { column, operator } => Issue::new(
            finding.kind(),
            format!("{} {} NULL never matches", column, operator),
            format!(
                "Comparing {} with {} yields NULL, not true or false, so the predicate \
                 matches no rows. The builder interpolated a missing value; use IS NULL \
                 or IS NOT NULL.",
                column, operator
            ),
            rank,
            IssueCategory::Integrity,
        )
        .with_suggestion(
            Suggestion::new("builder_misuse.is_null")
                .with("column", column)
                .with("operator", operator),
        ),
        EmptyInList { column } => Issue::new(
            finding.kind(),
            format!("Empty IN list on {}", column),
            format!(
                "{} IN () comes from interpolating an empty collection and is invalid \
                 SQL on most servers. Guard the branch before building the query.",
                column
            ),
            rank,
            IssueCategory::Integrity,
        )
        .with_suggestion(Suggestion::new("builder_misuse.guard_empty_in").with("column", column)),
        UnescapedLikeWildcard { pattern } => Issue::new(
            finding.kind(),
            format!("Unescaped wildcard in LIKE '{}'", pattern),
            format!(
                "The literal LIKE pattern '{}' carries unescaped % or _ characters. If \
                 the value came from user input, those wildcards broaden the match; \
                 escape them or bind the pattern as a parameter.",
                pattern
            ),
            rank,
            IssueCategory::Security,
        )
        .with_suggestion(
            Suggestion::new("builder_misuse.escape_like").with("pattern", pattern),
        ),
        UnboundPlaceholder { expected, bound } => Issue::new(
            finding.kind(),
            format!("{} named placeholder(s), {} parameter(s) bound", expected, bound),
            format!(
                "The query text names {} placeholder(s) but only {} parameter(s) were \
                 bound. Execution fails or reuses stale bindings depending on the \
                 driver.",
                expected, bound
            ),
            rank,
            IssueCategory::Security,
        )
        .with_suggestion(
            Suggestion::new("builder_misuse.bind_all")
                .with("expected", expected.to_string())
                .with("bound", bound.to_string()),
        ),
    }
}

/// Security analyzers in evaluation order
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![Box::new(InjectionRiskAnalyzer), Box::new(BuilderMisuseAnalyzer)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::model::{QueryTrace, Severity};
    use crate::sql::SqlCache;

    fn run(analyzer: &dyn Analyzer, trace: &QueryTrace) -> Vec<Issue> {
        let config = AnalysisConfig::default();
        run_with(analyzer, trace, &config)
    }

    fn run_with(
        analyzer: &dyn Analyzer,
        trace: &QueryTrace,
        config: &AnalysisConfig,
    ) -> Vec<Issue> {
        let cache = SqlCache::new(256);
        let ctx = AnalyzerContext::new(trace, &[], config, &cache);
        analyzer.analyze(&ctx)
    }

    #[test]
    fn test_injection_payload_in_literal_flagged() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM t WHERE x = '1 OR 1=1'",
            1.0,
        )]);
        let issues = run(&InjectionRiskAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "injection_risk");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].description.contains("SQL injection keywords"));
    }

    #[test]
    fn test_safe_status_literal_not_flagged() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM t WHERE status = 'active'",
            1.0,
        )]);
        assert!(run(&InjectionRiskAnalyzer, &trace).is_empty());
    }

    #[test]
    fn test_stacked_indicators_escalate_to_critical() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM t WHERE x = '1 OR 1=1' AND note = 'foo--'",
            1.0,
        )]);
        let issues = run(&InjectionRiskAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_one_issue_per_signature() {
        let trace = QueryTrace::from_iter([
            QueryRecord::new("SELECT * FROM t WHERE x = '2 UNION SELECT password'", 1.0),
            QueryRecord::new("SELECT * FROM t WHERE x = '3 UNION SELECT secret'", 1.0),
        ]);
        let issues = run(&InjectionRiskAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].origin_queries.len(), 2);
    }

    #[test]
    fn test_raised_min_risk_level_suppresses() {
        let mut config = AnalysisConfig::default();
        config.injection_risk.min_risk_level = 5;
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM t WHERE x = '1 OR 1=1'",
            1.0,
        )]);
        assert!(run_with(&InjectionRiskAnalyzer, &trace, &config).is_empty());
    }

    #[test]
    fn test_null_comparison_is_integrity_warning() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM users WHERE deleted_at != NULL",
            1.0,
        )]);
        let issues = run(&BuilderMisuseAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "null_comparison");
        assert_eq!(issues[0].category, IssueCategory::Integrity);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_empty_in_list_is_integrity_warning() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM users WHERE id IN ()",
            1.0,
        )]);
        let issues = run(&BuilderMisuseAnalyzer, &trace);
        assert_eq!(issues[0].issue_type, "empty_in_list");
        assert_eq!(issues[0].category, IssueCategory::Integrity);
    }

    #[test]
    fn test_unbound_placeholder_counts_in_title() {
        let trace = QueryTrace::from_iter([
            QueryRecord::new("SELECT * FROM t WHERE a = :a AND b = :b", 1.0)
                .with_params(vec![serde_json::json!(1)]),
        ]);
        let issues = run(&BuilderMisuseAnalyzer, &trace);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "unbound_placeholder");
        assert_eq!(issues[0].category, IssueCategory::Security);
        assert!(issues[0].title.contains("2 named placeholder(s), 1 parameter(s)"));
    }

    #[test]
    fn test_like_wildcard_is_security_info() {
        let trace = QueryTrace::from_iter([QueryRecord::new(
            "SELECT * FROM users WHERE name LIKE '%smith%'",
            1.0,
        )]);
        let issues = run(&BuilderMisuseAnalyzer, &trace);
        assert_eq!(issues[0].issue_type, "unescaped_like_wildcard");
        assert_eq!(issues[0].category, IssueCategory::Security);
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_well_formed_query_produces_no_findings() {
        let trace = QueryTrace::from_iter([
            QueryRecord::new("SELECT id FROM users WHERE deleted_at IS NULL AND org = ?", 1.0)
                .with_params(vec![serde_json::json!(7)]),
        ]);
        assert!(run(&BuilderMisuseAnalyzer, &trace).is_empty());
    }
}
