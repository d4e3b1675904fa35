//! Analyzer framework
//!
//! Every detection unit implements [`Analyzer`]: one stable id (also its
//! config section key), a category, and a single `analyze` pass over the
//! shared [`AnalyzerContext`]. Analyzers are pure with respect to the
//! trace and configuration, which is what lets the engine run them in
//! parallel and still produce deterministic output.

pub mod dedup;
pub mod engine;
pub mod rules;
pub mod severity;

use crate::config::AnalysisConfig;
use crate::model::{Issue, IssueCategory, MappingRecord, QueryRecord, QueryTrace};
use crate::sql::{SqlCache, StructuralQuery};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use engine::AnalysisEngine;

/// One detection unit
pub trait Analyzer: Send + Sync {
    /// Stable identifier, also the config section key
    fn id(&self) -> &'static str;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Primary category for this analyzer's issues
    fn category(&self) -> IssueCategory;

    /// Inspect the trace and return zero or more issues
    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue>;
}

/// Immutable inputs shared by all analyzers in one pass
pub struct AnalyzerContext<'a> {
    pub trace: &'a QueryTrace,
    pub mappings: &'a [MappingRecord],
    pub config: &'a AnalysisConfig,
    cache: &'a SqlCache,
}

impl<'a> AnalyzerContext<'a> {
    pub fn new(
        trace: &'a QueryTrace,
        mappings: &'a [MappingRecord],
        config: &'a AnalysisConfig,
        cache: &'a SqlCache,
    ) -> Self {
        Self {
            trace,
            mappings,
            config,
            cache,
        }
    }

    /// Structural view of one record, computed once per distinct SQL text
    pub fn structure(&self, record: &QueryRecord) -> Arc<StructuralQuery> {
        self.cache.structure(&record.sql)
    }

    /// Normalized signature of one record, computed once per distinct SQL
    /// text
    pub fn signature(&self, record: &QueryRecord) -> Arc<str> {
        self.cache.signature(&record.sql)
    }

    /// Records grouped by normalized signature. Keys iterate in signature
    /// order; records keep their trace order inside each group.
    pub fn group_by_signature(&self) -> BTreeMap<Arc<str>, Vec<&'a QueryRecord>> {
        let mut groups: BTreeMap<Arc<str>, Vec<&'a QueryRecord>> = BTreeMap::new();
        for record in self.trace.iter() {
            groups
                .entry(self.signature(record))
                .or_default()
                .push(record);
        }
        groups
    }
}
