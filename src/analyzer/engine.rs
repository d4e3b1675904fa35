//! Analysis engine
//!
//! Owns the enabled analyzer set, the shared SQL cache, and the pass
//! pipeline: run every analyzer over the trace, merge, deduplicate,
//! filter, return. Construction is the only fallible step; a pass never
//! fails, a broken analyzer just contributes nothing.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use crate::analyzer::{Analyzer, AnalyzerContext, dedup, rules};
use crate::config::AnalysisConfig;
use crate::error::ConfigError;
use crate::model::{Issue, IssueCollection, MappingRecord, QueryTrace};
use crate::sql::SqlCache;

/// Configured analysis engine, reusable across traces
///
/// The engine is `Send + Sync`; one instance can serve concurrent passes,
/// sharing its parse cache between them.
pub struct AnalysisEngine {
    config: AnalysisConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
    cache: SqlCache,
}

impl AnalysisEngine {
    /// Build an engine from a validated configuration
    ///
    /// This is the only operation that can fail; a rejected threshold
    /// surfaces here, before any trace is touched.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let analyzers: Vec<Box<dyn Analyzer>> = rules::all_analyzers()
            .into_iter()
            .filter(|a| config.is_enabled(a.id()))
            .collect();
        let cache = SqlCache::new(config.engine.cache_capacity);
        tracing::debug!(
            analyzers = analyzers.len(),
            cache_capacity = config.engine.cache_capacity,
            "analysis engine ready"
        );
        Ok(Self {
            config,
            analyzers,
            cache,
        })
    }

    #[cfg(test)]
    fn with_analyzers(config: AnalysisConfig, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        let cache = SqlCache::new(config.engine.cache_capacity);
        Self {
            config,
            analyzers,
            cache,
        }
    }

    /// Ids of the analyzers this engine will run
    pub fn analyzer_ids(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.id()).collect()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run a pass over a trace without mapping metadata
    pub fn analyze(&self, trace: &QueryTrace) -> IssueCollection {
        self.analyze_with_mappings(trace, &[])
    }

    /// Run a full pass: analyzers in parallel, then merge, dedup, filter
    ///
    /// Identical input and configuration produce identical output,
    /// ordering included.
    pub fn analyze_with_mappings(
        &self,
        trace: &QueryTrace,
        mappings: &[MappingRecord],
    ) -> IssueCollection {
        let ctx = AnalyzerContext::new(trace, mappings, &self.config, &self.cache);
        tracing::debug!(
            queries = trace.len(),
            mappings = mappings.len(),
            "starting analysis pass"
        );

        // collect() preserves registry order regardless of which worker
        // finishes first
        let results: Vec<Vec<Issue>> = self
            .analyzers
            .par_iter()
            .map(|analyzer| {
                match panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&ctx))) {
                    Ok(issues) => issues,
                    Err(_) => {
                        tracing::warn!(
                            analyzer = analyzer.id(),
                            "AnalyzerFatalFailure: analyzer panicked and contributed no issues"
                        );
                        Vec::new()
                    }
                }
            })
            .collect();

        let mut merged = IssueCollection::new();
        for issues in results {
            merged.extend(IssueCollection::from_issues(issues));
        }

        let deduplicated = dedup::deduplicate(merged, &self.cache);

        let min = self.config.engine.min_severity;
        let mut issues: Vec<Issue> = deduplicated
            .into_vec()
            .into_iter()
            .filter(|issue| issue.severity >= min)
            .collect();
        if let Some(cap) = self.config.engine.max_issues {
            issues.truncate(cap);
        }

        let collection = IssueCollection::from_issues(issues);
        tracing::debug!(issues = collection.len(), "analysis pass complete");
        collection
    }
}

/// One-shot pass: build an engine for `config` and analyze `trace`
pub fn analyze_trace(
    trace: &QueryTrace,
    config: AnalysisConfig,
) -> Result<IssueCollection, ConfigError> {
    Ok(AnalysisEngine::new(config)?.analyze(trace))
}
