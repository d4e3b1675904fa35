//! Analysis configuration
//!
//! Per-analyzer sections (an `enabled` switch plus that analyzer's
//! thresholds) and engine-level settings. Every field has a documented
//! default; a host can deserialize a partial JSON map over the defaults
//! with [`AnalysisConfig::from_value`]. Unknown keys are ignored so old
//! configs keep working.

use crate::error::ConfigError;
use crate::model::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub n_plus_one: NPlusOneConfig,
    pub duplicate_query: DuplicateQueryConfig,
    pub partial_collection: PartialCollectionConfig,
    pub slow_query: SlowQueryConfig,
    pub select_star: ToggleConfig,
    pub unbounded_result: UnboundedResultConfig,
    pub leading_wildcard_like: ToggleConfig,
    pub offset_pagination: OffsetPaginationConfig,
    pub missing_index: MissingIndexConfig,
    pub wasted_join: ToggleConfig,
    pub left_join_as_inner: ToggleConfig,
    pub excessive_joins: ExcessiveJoinsConfig,
    pub injection_risk: InjectionRiskConfig,
    pub builder_misuse: ToggleConfig,
    pub cascade_remove: ToggleConfig,
    pub orphan_removal: ToggleConfig,
    pub missing_cascade_persist: ToggleConfig,
    pub engine: EngineConfig,
}

/// Section for analyzers that carry no thresholds of their own
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ToggleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NPlusOneConfig {
    pub enabled: bool,
    /// Occurrence count at which a repeated-query group is called N+1
    /// (default: 5)
    pub threshold: usize,
    /// Occurrence count at which repetition alone is worth reporting,
    /// even for fast queries (default: 3)
    pub repetition_floor: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DuplicateQueryConfig {
    pub enabled: bool,
    /// Identical-text executions at which a duplicate is reported
    /// (default: 2)
    pub threshold: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PartialCollectionConfig {
    pub enabled: bool,
    /// Paginated FK lookups of the same shape before reporting
    /// (default: 2)
    pub threshold: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SlowQueryConfig {
    pub enabled: bool,
    /// Execution time above which a query is reported (default: 10.0 ms)
    pub threshold_ms: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UnboundedResultConfig {
    pub enabled: bool,
    /// Row count above which an un-LIMITed SELECT is reported
    /// (default: 1000)
    pub max_rows: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OffsetPaginationConfig {
    pub enabled: bool,
    /// OFFSET value above which deep pagination is reported
    /// (default: 1000)
    pub max_offset: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MissingIndexConfig {
    pub enabled: bool,
    /// Examined-row count at which a scan looks unindexed (default: 1000)
    pub min_rows_scanned: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExcessiveJoinsConfig {
    pub enabled: bool,
    /// JOIN count above which a query is reported (default: 5)
    pub max_joins: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InjectionRiskConfig {
    pub enabled: bool,
    /// Risk score below which scan results are discarded (default: 2)
    pub min_risk_level: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Lowest severity kept in the final collection (default: info)
    pub min_severity: Severity,
    /// Optional cap on the final issue count, applied after sorting
    pub max_issues: Option<usize>,
    /// Entry ceiling for each SQL cache map (default: 1024)
    pub cache_capacity: usize,
}

impl AnalysisConfig {
    /// Deserialize from a JSON map, falling back to defaults for missing
    /// keys, then validate
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that would make analysis meaningless: zeroes
    /// where a minimum of one applies, and non-positive or NaN times
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_plus_one.threshold == 0 {
            return Err(invalid("n_plus_one", "threshold", self.n_plus_one.threshold));
        }
        if self.n_plus_one.repetition_floor == 0 {
            return Err(invalid(
                "n_plus_one",
                "repetition_floor",
                self.n_plus_one.repetition_floor,
            ));
        }
        if self.duplicate_query.threshold == 0 {
            return Err(invalid(
                "duplicate_query",
                "threshold",
                self.duplicate_query.threshold,
            ));
        }
        if self.partial_collection.threshold == 0 {
            return Err(invalid(
                "partial_collection",
                "threshold",
                self.partial_collection.threshold,
            ));
        }
        if !(self.slow_query.threshold_ms > 0.0) {
            return Err(invalid(
                "slow_query",
                "threshold_ms",
                self.slow_query.threshold_ms,
            ));
        }
        if self.unbounded_result.max_rows == 0 {
            return Err(invalid(
                "unbounded_result",
                "max_rows",
                self.unbounded_result.max_rows,
            ));
        }
        if self.offset_pagination.max_offset == 0 {
            return Err(invalid(
                "offset_pagination",
                "max_offset",
                self.offset_pagination.max_offset,
            ));
        }
        if self.missing_index.min_rows_scanned == 0 {
            return Err(invalid(
                "missing_index",
                "min_rows_scanned",
                self.missing_index.min_rows_scanned,
            ));
        }
        if self.excessive_joins.max_joins == 0 {
            return Err(invalid(
                "excessive_joins",
                "max_joins",
                self.excessive_joins.max_joins,
            ));
        }
        if self.engine.cache_capacity == 0 {
            return Err(invalid("engine", "cache_capacity", self.engine.cache_capacity));
        }
        if self.engine.max_issues == Some(0) {
            return Err(invalid("engine", "max_issues", 0));
        }
        Ok(())
    }

    /// Whether the section for `analyzer_id` is switched on
    pub fn is_enabled(&self, analyzer_id: &str) -> bool {
        match analyzer_id {
            "n_plus_one" => self.n_plus_one.enabled,
            "duplicate_query" => self.duplicate_query.enabled,
            "partial_collection" => self.partial_collection.enabled,
            "slow_query" => self.slow_query.enabled,
            "select_star" => self.select_star.enabled,
            "unbounded_result" => self.unbounded_result.enabled,
            "leading_wildcard_like" => self.leading_wildcard_like.enabled,
            "offset_pagination" => self.offset_pagination.enabled,
            "missing_index" => self.missing_index.enabled,
            "wasted_join" => self.wasted_join.enabled,
            "left_join_as_inner" => self.left_join_as_inner.enabled,
            "excessive_joins" => self.excessive_joins.enabled,
            "injection_risk" => self.injection_risk.enabled,
            "builder_misuse" => self.builder_misuse.enabled,
            "cascade_remove" => self.cascade_remove.enabled,
            "orphan_removal" => self.orphan_removal.enabled,
            "missing_cascade_persist" => self.missing_cascade_persist.enabled,
            _ => true,
        }
    }
}

fn invalid(
    analyzer: &'static str,
    key: &'static str,
    value: impl std::fmt::Display,
) -> ConfigError {
    ConfigError::InvalidThreshold {
        analyzer,
        key,
        value: value.to_string(),
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for NPlusOneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 5,
            repetition_floor: 3,
        }
    }
}

impl Default for DuplicateQueryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 2,
        }
    }
}

impl Default for PartialCollectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 2,
        }
    }
}

impl Default for SlowQueryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_ms: 10.0,
        }
    }
}

impl Default for UnboundedResultConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rows: 1000,
        }
    }
}

impl Default for OffsetPaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_offset: 1000,
        }
    }
}

impl Default for MissingIndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_rows_scanned: 1000,
        }
    }
}

impl Default for ExcessiveJoinsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_joins: 5,
        }
    }
}

impl Default for InjectionRiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_risk_level: 2,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            max_issues: None,
            cache_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_documented_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.n_plus_one.threshold, 5);
        assert_eq!(config.n_plus_one.repetition_floor, 3);
        assert_eq!(config.slow_query.threshold_ms, 10.0);
        assert_eq!(config.missing_index.min_rows_scanned, 1000);
        assert_eq!(config.duplicate_query.threshold, 2);
        assert_eq!(config.unbounded_result.max_rows, 1000);
        assert_eq!(config.offset_pagination.max_offset, 1000);
        assert_eq!(config.excessive_joins.max_joins, 5);
        assert_eq!(config.injection_risk.min_risk_level, 2);
        assert_eq!(config.engine.cache_capacity, 1024);
        assert_eq!(config.engine.min_severity, Severity::Info);
        assert!(config.select_star.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = AnalysisConfig::from_value(json!({
            "n_plus_one": { "threshold": 10 },
            "slow_query": { "enabled": false }
        }))
        .unwrap();
        assert_eq!(config.n_plus_one.threshold, 10);
        assert_eq!(config.n_plus_one.repetition_floor, 3);
        assert!(config.n_plus_one.enabled);
        assert!(!config.slow_query.enabled);
        assert_eq!(config.slow_query.threshold_ms, 10.0);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = AnalysisConfig::from_value(json!({
            "n_plus_one": { "threshold": 7, "future_knob": true },
            "not_an_analyzer": { "enabled": false }
        }))
        .unwrap();
        assert_eq!(config.n_plus_one.threshold, 7);
    }

    #[test]
    fn test_min_severity_parses_lowercase() {
        let config = AnalysisConfig::from_value(json!({
            "engine": { "min_severity": "warning" }
        }))
        .unwrap();
        assert_eq!(config.engine.min_severity, Severity::Warning);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = AnalysisConfig::from_value(json!({
            "n_plus_one": { "threshold": 0 }
        }));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidThreshold {
                analyzer: "n_plus_one",
                key: "threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_time_rejected() {
        let result = AnalysisConfig::from_value(json!({
            "slow_query": { "threshold_ms": -5.0 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_nan_time_rejected() {
        let mut config = AnalysisConfig::default();
        config.slow_query.threshold_ms = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_issue_cap_rejected() {
        let result = AnalysisConfig::from_value(json!({
            "engine": { "max_issues": 0 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_enabled_routing() {
        let config = AnalysisConfig::from_value(json!({
            "wasted_join": { "enabled": false }
        }))
        .unwrap();
        assert!(!config.is_enabled("wasted_join"));
        assert!(config.is_enabled("n_plus_one"));
        assert!(config.is_enabled("unknown_future_analyzer"));
    }
}
