//! Query trace data model
//!
//! A trace is the unit of analysis: an ordered list of observed SQL
//! executions collected by the host (for example, all queries issued while
//! serving one HTTP request). Records are immutable once constructed and
//! every trace transformation returns a new collection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Query Record
// ============================================================================

/// One frame of the application backtrace attached to a query execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktraceFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl BacktraceFrame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }
}

/// One observed SQL execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    /// Raw SQL text as executed
    pub sql: String,
    /// Wall-clock execution time in milliseconds, never negative
    pub execution_time_ms: f64,
    /// Ordered bound parameter values
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    /// Rows returned, when the host recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Rows examined according to an EXPLAIN-style plan, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examined_rows: Option<u64>,
    /// Application backtrace captured at execution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<BacktraceFrame>>,
}

impl QueryRecord {
    /// Create a record; negative durations are clamped to zero
    pub fn new(sql: impl Into<String>, execution_time_ms: f64) -> Self {
        Self {
            sql: sql.into(),
            execution_time_ms: execution_time_ms.max(0.0),
            params: Vec::new(),
            row_count: None,
            examined_rows: None,
            backtrace: None,
        }
    }

    pub fn with_params(mut self, params: Vec<serde_json::Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn with_examined_rows(mut self, rows: u64) -> Self {
        self.examined_rows = Some(rows);
        self
    }

    pub fn with_backtrace(mut self, frames: Vec<BacktraceFrame>) -> Self {
        self.backtrace = Some(frames);
        self
    }
}

// ============================================================================
// Query Trace
// ============================================================================

/// Ordered, insertion-order-preserving collection of query records
///
/// Value semantics: `filter`, `sorted_by_time_desc` and friends build a new
/// trace and leave the original untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTrace {
    records: Vec<QueryRecord>,
}

impl QueryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<QueryRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: QueryRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryRecord> {
        self.records.iter()
    }

    /// New trace containing only records matching the predicate
    pub fn filter<F>(&self, predicate: F) -> QueryTrace
    where
        F: Fn(&QueryRecord) -> bool,
    {
        QueryTrace {
            records: self
                .records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        }
    }

    /// New trace sorted by execution time, slowest first (stable)
    pub fn sorted_by_time_desc(&self) -> QueryTrace {
        let mut records = self.records.clone();
        records.sort_by(|a, b| {
            b.execution_time_ms
                .partial_cmp(&a.execution_time_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        QueryTrace { records }
    }

    /// Group records by a derived key, preserving insertion order per group
    ///
    /// The result is a `BTreeMap` so group iteration order is independent of
    /// input order.
    pub fn group_by<K, F>(&self, key: F) -> BTreeMap<K, QueryTrace>
    where
        K: Ord,
        F: Fn(&QueryRecord) -> K,
    {
        let mut groups: BTreeMap<K, QueryTrace> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(key(record))
                .or_default()
                .push(record.clone());
        }
        groups
    }

    /// Sum of execution times across the trace in milliseconds
    pub fn total_time_ms(&self) -> f64 {
        self.records.iter().map(|r| r.execution_time_ms).sum()
    }

    /// The `n` slowest records, slowest first
    pub fn slowest(&self, n: usize) -> Vec<&QueryRecord> {
        let mut refs: Vec<&QueryRecord> = self.records.iter().collect();
        refs.sort_by(|a, b| {
            b.execution_time_ms
                .partial_cmp(&a.execution_time_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        refs.truncate(n);
        refs
    }
}

impl FromIterator<QueryRecord> for QueryTrace {
    fn from_iter<I: IntoIterator<Item = QueryRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a QueryTrace {
    type Item = &'a QueryRecord;
    type IntoIter = std::slice::Iter<'a, QueryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for QueryTrace {
    type Item = QueryRecord;
    type IntoIter = std::vec::IntoIter<QueryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
