//! End-to-end engine tests over realistic traces

use crate::analyzer::AnalysisEngine;
use crate::config::AnalysisConfig;
use crate::model::{
    AssociationKind, CascadeAction, MappingRecord, QueryRecord, QueryTrace, Severity,
};
use crate::tests::common;

fn engine() -> AnalysisEngine {
    common::init_tracing();
    AnalysisEngine::new(AnalysisConfig::default()).unwrap()
}

fn types(issues: &crate::model::IssueCollection) -> Vec<&str> {
    issues.iter().map(|i| i.issue_type.as_str()).collect()
}

#[test]
fn test_mixed_workload_reports_across_families() {
    let issues = engine().analyze(&common::mixed_workload());
    let found = types(&issues);
    assert!(found.contains(&"n_plus_one"));
    assert!(found.contains(&"slow_query"));
    assert!(found.contains(&"unbounded_result"));
    assert!(found.contains(&"wasted_join"));
    assert!(found.contains(&"select_star"));
}

#[test]
fn test_output_sorted_critical_first() {
    let issues = engine().analyze(&common::mixed_workload());
    let severities: Vec<Severity> = issues.iter().map(|i| i.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(severities, sorted);
    assert_eq!(issues.issues()[0].severity, Severity::Critical);
}

#[test]
fn test_reordered_trace_same_findings() {
    let forward = common::mixed_workload();
    let reversed: QueryTrace = forward.iter().rev().cloned().collect();

    let eng = engine();
    let mut first: Vec<(String, Severity)> = eng
        .analyze(&forward)
        .iter()
        .map(|i| (i.issue_type.clone(), i.severity))
        .collect();
    let mut second: Vec<(String, Severity)> = eng
        .analyze(&reversed)
        .iter()
        .map(|i| (i.issue_type.clone(), i.severity))
        .collect();
    first.sort();
    second.sort();
    assert_eq!(first, second);
}

#[test]
fn test_disabling_an_analyzer_removes_its_findings() {
    common::init_tracing();
    let mut config = AnalysisConfig::default();
    config.n_plus_one.enabled = false;
    let eng = AnalysisEngine::new(config).unwrap();

    let issues = eng.analyze(&common::mixed_workload());
    let found = types(&issues);
    assert!(!found.contains(&"n_plus_one"));
    // the rest of the pass is untouched
    assert!(found.contains(&"slow_query"));
}

#[test]
fn test_per_record_findings_dedup_to_one_issue() {
    let trace = QueryTrace::from_iter([
        QueryRecord::new("SELECT id FROM t WHERE deleted_at != NULL AND org = 1", 1.0),
        QueryRecord::new("SELECT id FROM t WHERE deleted_at != NULL AND org = 2", 1.0),
        QueryRecord::new("SELECT id FROM t WHERE deleted_at != NULL AND org = 3", 1.0),
    ]);
    let issues = engine().analyze(&trace);
    let null_comparisons: Vec<_> = issues
        .iter()
        .filter(|i| i.issue_type == "null_comparison")
        .collect();
    assert_eq!(null_comparisons.len(), 1);
    assert_eq!(null_comparisons[0].origin_queries.len(), 3);
}

#[test]
fn test_engine_reused_across_traces() {
    let eng = engine();
    let first = eng.analyze(&common::mixed_workload());
    assert!(!first.is_empty());

    let second = eng.analyze(&QueryTrace::new());
    assert!(second.is_empty());
}

#[test]
fn test_summary_matches_collection() {
    let issues = engine().analyze(&common::mixed_workload());
    let summary = issues.summary();
    assert_eq!(summary.total_issues, issues.len());
    assert_eq!(
        summary.critical + summary.warning + summary.info,
        issues.len()
    );
    assert!(summary.health_score < 100);
}

#[test]
fn test_mapping_records_flow_through_the_pass() {
    let mappings = vec![
        MappingRecord::new("User", "orders", AssociationKind::OneToMany)
            .with_cascade(vec![CascadeAction::Remove]),
    ];
    let issues = engine().analyze_with_mappings(&QueryTrace::new(), &mappings);

    let found = types(&issues);
    assert!(found.contains(&"cascade_remove"));
    assert!(found.contains(&"missing_cascade_persist"));
    assert!(
        issues
            .iter()
            .all(|i| i.setting_name.as_deref() == Some("User.orders"))
    );
    // warning sorts before info
    assert_eq!(issues.issues()[0].issue_type, "cascade_remove");
}
