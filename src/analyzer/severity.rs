//! Centralized severity policy
//!
//! Analyzers never rank their own findings. They hand their impact
//! metrics (occurrence counts, execution times, rows scanned) to one of
//! these functions so every boundary lives here, documented and testable
//! in one place. `should_suppress` is the companion noise floor applied
//! before an issue is even constructed.

use crate::detect::builder::BuilderFinding;
use crate::model::Severity;

// ============================================================================
// Suppression floors
// ============================================================================

/// Noise floors evaluated before issue construction. Independent of the
/// severity boundaries below, and lower than the configurable analyzer
/// thresholds.
pub mod floors {
    /// Repetition groups below this count never become issues
    pub const N_PLUS_ONE_MIN_COUNT: usize = 3;
    /// Queries faster than this never become slow-query issues
    pub const SLOW_QUERY_MIN_MS: f64 = 10.0;
    /// Exact-duplicate groups need at least this many occurrences
    pub const DUPLICATE_MIN_COUNT: usize = 2;
    /// Injection scans below this risk level are discarded
    pub const INJECTION_MIN_RISK: u32 = 2;
}

/// Noise filter: true when a candidate finding is too small to report
pub fn should_suppress_repetition(count: usize) -> bool {
    count < floors::N_PLUS_ONE_MIN_COUNT
}

pub fn should_suppress_slow_query(time_ms: f64) -> bool {
    time_ms < floors::SLOW_QUERY_MIN_MS
}

pub fn should_suppress_duplicate(count: usize) -> bool {
    count < floors::DUPLICATE_MIN_COUNT
}

pub fn should_suppress_injection(risk_level: u32) -> bool {
    risk_level < floors::INJECTION_MIN_RISK
}

// ============================================================================
// Severity boundaries
// ============================================================================

/// Repeated-query impact: either many occurrences or much total time
pub fn severity_for_n_plus_one(count: usize, total_time_ms: f64) -> Severity {
    if count > 100 || total_time_ms > 100.0 {
        Severity::Critical
    } else if count > 10 || total_time_ms > 10.0 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Full-scan impact: rows examined or time spent without an index
pub fn severity_for_missing_index(rows_scanned: u64, query_time_ms: f64) -> Severity {
    if rows_scanned > 100_000 || query_time_ms > 100.0 {
        Severity::Critical
    } else if rows_scanned > 1_000 || query_time_ms > 10.0 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Single-query latency. The warning bound is inclusive at 10ms, the
/// critical bound strictly above 100ms.
pub fn severity_for_slow_query(time_ms: f64) -> Severity {
    if time_ms > 100.0 {
        Severity::Critical
    } else if time_ms >= 10.0 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Injection risk score from the weighted indicator scan
pub fn severity_for_injection(risk_level: u32) -> Severity {
    if risk_level > 4 {
        Severity::Critical
    } else if risk_level > 2 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// JOIN fan-out beyond the configured ceiling
pub fn severity_for_join_count(join_count: usize) -> Severity {
    if join_count > 10 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Builder misuse severity by finding kind
pub fn severity_for_builder_misuse(finding: &BuilderFinding) -> Severity {
    match finding {
        BuilderFinding::NullComparison { .. }
        | BuilderFinding::EmptyInList { .. }
        | BuilderFinding::UnboundPlaceholder { .. } => Severity::Warning,
        BuilderFinding::UnescapedLikeWildcard { .. } => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_plus_one_boundaries() {
        assert_eq!(severity_for_n_plus_one(101, 0.0), Severity::Critical);
        assert_eq!(severity_for_n_plus_one(5, 100.0001), Severity::Critical);
        assert_eq!(severity_for_n_plus_one(11, 0.0), Severity::Warning);
        assert_eq!(severity_for_n_plus_one(5, 10.0001), Severity::Warning);
        assert_eq!(severity_for_n_plus_one(10, 10.0), Severity::Info);
        assert_eq!(severity_for_n_plus_one(3, 2.97), Severity::Info);
    }

    #[test]
    fn test_missing_index_boundaries() {
        assert_eq!(severity_for_missing_index(100_001, 0.0), Severity::Critical);
        assert_eq!(severity_for_missing_index(0, 100.5), Severity::Critical);
        assert_eq!(severity_for_missing_index(1_001, 0.0), Severity::Warning);
        assert_eq!(severity_for_missing_index(50, 11.0), Severity::Warning);
        assert_eq!(severity_for_missing_index(1_000, 10.0), Severity::Info);
    }

    #[test]
    fn test_slow_query_boundaries() {
        assert_eq!(severity_for_slow_query(10.0), Severity::Warning);
        assert_eq!(severity_for_slow_query(10.0001), Severity::Warning);
        assert_eq!(severity_for_slow_query(100.0), Severity::Warning);
        assert_eq!(severity_for_slow_query(100.0001), Severity::Critical);
        assert_eq!(severity_for_slow_query(9.9999), Severity::Info);
    }

    #[test]
    fn test_injection_boundaries() {
        assert_eq!(severity_for_injection(5), Severity::Critical);
        assert_eq!(severity_for_injection(4), Severity::Warning);
        assert_eq!(severity_for_injection(3), Severity::Warning);
        assert_eq!(severity_for_injection(2), Severity::Info);
    }

    #[test]
    fn test_suppression_floors() {
        assert!(should_suppress_repetition(2));
        assert!(!should_suppress_repetition(3));
        assert!(should_suppress_slow_query(9.9999));
        assert!(!should_suppress_slow_query(10.0));
        assert!(should_suppress_duplicate(1));
        assert!(!should_suppress_duplicate(2));
        assert!(should_suppress_injection(1));
        assert!(!should_suppress_injection(2));
    }

    #[test]
    fn test_builder_misuse_kinds() {
        let null_cmp = BuilderFinding::NullComparison {
            column: "a".to_string(),
            operator: "=".to_string(),
        };
        let wildcard = BuilderFinding::UnescapedLikeWildcard {
            pattern: "%x%".to_string(),
        };
        assert_eq!(severity_for_builder_misuse(&null_cmp), Severity::Warning);
        assert_eq!(severity_for_builder_misuse(&wildcard), Severity::Info);
    }
}
