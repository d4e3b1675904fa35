//! Query trace diagnostics
//!
//! Takes an ordered trace of executed SQL queries (plus optional entity
//! mapping metadata) and reports the inefficiencies hiding in it: N+1
//! lookup storms, missing indexes, string-built SQL, cascade
//! misconfiguration. Detection is behavioral; nothing here connects to a
//! database or reads application code.
//!
//! A pass flows through four layers:
//! - `sql` parses each query into a [`sql::StructuralQuery`] (grammar
//!   parser with a regex fallback, results cached by query text)
//! - `detect` holds the stateless shape predicates analyzers share
//! - `analyzer` runs every enabled rule over the trace, then
//!   deduplicates, ranks, and orders the findings
//! - `model` defines the trace input and [`model::Issue`] output records
//!
//! ```
//! use querylint::{AnalysisConfig, QueryRecord, QueryTrace, analyze_trace};
//!
//! let trace: QueryTrace = (1..=12)
//!     .map(|id| {
//!         QueryRecord::new("SELECT * FROM users WHERE id = ?", 0.3)
//!             .with_params(vec![id.into()])
//!     })
//!     .collect();
//!
//! let issues = analyze_trace(&trace, AnalysisConfig::default())?;
//! assert!(issues.iter().any(|i| i.issue_type == "lazy_loading"));
//! # Ok::<(), querylint::ConfigError>(())
//! ```

pub mod analyzer;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod sql;

// Re-export commonly used types
pub use analyzer::AnalysisEngine;
pub use analyzer::engine::analyze_trace;
pub use config::AnalysisConfig;
pub use error::ConfigError;
pub use model::{
    AssociationKind, BacktraceFrame, CascadeAction, Issue, IssueCategory, IssueCollection,
    MappingRecord, QueryRecord, QueryTrace, Severity, Suggestion, TraceSummary,
};

#[cfg(test)]
mod tests;
