// Common test utilities and helpers

use crate::model::{QueryRecord, QueryTrace};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `count` identical point lookups with distinct bound ids
pub fn point_lookup_trace(count: usize, time_ms: f64) -> QueryTrace {
    (1..=count)
        .map(|id| {
            QueryRecord::new("SELECT * FROM users WHERE id = ?", time_ms)
                .with_params(vec![serde_json::json!(id)])
        })
        .collect()
}

/// `count` child-collection lookups keyed by a foreign key literal
pub fn fk_lookup_trace(count: usize, time_ms: f64) -> QueryTrace {
    (1..=count)
        .map(|id| {
            QueryRecord::new(
                format!("SELECT * FROM comments WHERE post_id = {id}"),
                time_ms,
            )
        })
        .collect()
}

/// A small mixed workload covering several analyzer families
pub fn mixed_workload() -> QueryTrace {
    let mut trace = fk_lookup_trace(8, 0.4);
    trace.push(QueryRecord::new(
        "SELECT * FROM orders WHERE status = 'open'",
        150.0,
    ));
    trace.push(QueryRecord::new("SELECT * FROM audit_log", 3.0).with_row_count(40_000));
    trace.push(QueryRecord::new(
        "SELECT u.id FROM users u LEFT JOIN profiles p ON u.id = p.user_id",
        2.0,
    ));
    trace
}
