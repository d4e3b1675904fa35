//! Acceptance scenarios pinning the documented detection contracts

use crate::analyzer::AnalysisEngine;
use crate::config::AnalysisConfig;
use crate::model::{QueryRecord, QueryTrace, Severity};
use crate::sql;
use crate::tests::common;

const REPETITION_TYPES: [&str; 5] = [
    "n_plus_one",
    "lazy_loading",
    "repeated_query",
    "duplicate_query",
    "partial_collection_load",
];

fn engine() -> AnalysisEngine {
    common::init_tracing();
    AnalysisEngine::new(AnalysisConfig::default()).unwrap()
}

#[test]
fn test_eleven_fast_point_lookups_are_reported() {
    // 0.27ms each: far below any latency threshold, caught on count alone
    let issues = engine().analyze(&common::point_lookup_trace(11, 0.27));
    assert!(
        issues
            .iter()
            .any(|i| REPETITION_TYPES.contains(&i.issue_type.as_str()))
    );
}

#[test]
fn test_two_point_lookups_are_not_reported() {
    let issues = engine().analyze(&common::point_lookup_trace(2, 0.27));
    assert!(
        !issues
            .iter()
            .any(|i| REPETITION_TYPES.contains(&i.issue_type.as_str()))
    );
}

#[test]
fn test_slow_query_boundary_at_100ms() {
    let at_bound = QueryTrace::from_iter([QueryRecord::new(
        "SELECT id FROM reports WHERE org = 1",
        100.0,
    )]);
    let over = QueryTrace::from_iter([QueryRecord::new(
        "SELECT id FROM reports WHERE org = 1",
        100.1,
    )]);

    let eng = engine();
    let warning = eng.analyze(&at_bound);
    let slow: Vec<_> = warning
        .iter()
        .filter(|i| i.issue_type == "slow_query")
        .collect();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].severity, Severity::Warning);

    let critical = eng.analyze(&over);
    assert_eq!(
        critical
            .iter()
            .find(|i| i.issue_type == "slow_query")
            .map(|i| i.severity),
        Some(Severity::Critical)
    );
}

#[test]
fn test_ten_millisecond_query_not_reported() {
    let trace = QueryTrace::from_iter([QueryRecord::new(
        "SELECT id FROM reports WHERE org = 1",
        10.0,
    )]);
    let issues = engine().analyze(&trace);
    assert!(!issues.iter().any(|i| i.issue_type == "slow_query"));
}

#[test]
fn test_injection_keyword_payload_reported() {
    let trace = QueryTrace::from_iter([QueryRecord::new(
        "SELECT * FROM t WHERE x = '1 OR 1=1'",
        1.0,
    )]);
    let issues = engine().analyze(&trace);
    let injection = issues
        .iter()
        .find(|i| i.issue_type == "injection_risk")
        .unwrap();
    assert!(injection.description.contains("SQL injection keywords"));
}

#[test]
fn test_allowlisted_status_literal_silent() {
    let trace = QueryTrace::from_iter([QueryRecord::new(
        "SELECT * FROM t WHERE status = 'active'",
        1.0,
    )]);
    let issues = engine().analyze(&trace);
    assert!(!issues.iter().any(|i| i.issue_type == "injection_risk"));
}

#[test]
fn test_left_outer_join_filter_reported_as_inner() {
    let trace = QueryTrace::from_iter([QueryRecord::new(
        "SELECT u.id, p.bio FROM users u LEFT OUTER JOIN profiles p ON u.id = p.user_id \
         WHERE p.id IS NOT NULL",
        2.0,
    )]);
    let issues = engine().analyze(&trace);
    assert!(issues.iter().any(|i| i.issue_type == "left_join_as_inner"));
    assert!(!issues.iter().any(|i| i.issue_type == "wasted_join"));
}

#[test]
fn test_join_keyword_on_is_not_an_alias() {
    let structure = sql::extract(
        "SELECT o.id, order_items.qty FROM orders o \
         JOIN order_items ON o.id = order_items.order_id",
    );
    assert_eq!(structure.joins.len(), 1);
    assert_eq!(structure.joins[0].table, "order_items");
    assert_eq!(structure.joins[0].alias, None);
}

#[test]
fn test_identical_duplicate_pair_reported() {
    let trace = QueryTrace::from_iter([
        QueryRecord::new("SELECT name FROM settings WHERE id = 1", 0.2),
        QueryRecord::new("SELECT name FROM settings WHERE id = 1", 0.2),
    ]);
    let issues = engine().analyze(&trace);
    assert!(issues.iter().any(|i| i.issue_type == "duplicate_query"));
}

#[test]
fn test_malformed_sql_never_fails_the_pass() {
    let trace = QueryTrace::from_iter([
        QueryRecord::new("SELECT FROM WHERE ((", 1.0),
        QueryRecord::new("", 1.0),
        QueryRecord::new("SELECT * FROM users WHERE id = 1", 0.5),
    ]);
    let issues = engine().analyze(&trace);
    // the well-formed record still gets analyzed
    assert!(issues.iter().any(|i| i.issue_type == "select_star"));
}

#[test]
fn test_issue_serialization_shape() {
    let issues = engine().analyze(&common::point_lookup_trace(11, 0.27));
    let value = serde_json::to_value(&issues).unwrap();
    let first = &value.as_array().unwrap()[0];
    assert!(first.get("type").is_some());
    assert!(first.get("severity").is_some());
    assert!(first.get("queries").is_some());
    // absent optionals are omitted, not null
    assert!(first.get("settingName").is_none());
}
