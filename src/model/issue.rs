//! Issue model
//!
//! Issues are the immutable result units of an analysis pass. Analyzers
//! construct them once; the deduplicator either discards an issue or builds
//! a merged replacement, it never mutates one in place.

use super::query::BacktraceFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Severity and Category
// ============================================================================

/// Severity level of a detected issue
///
/// The discriminants define the total order used everywhere: a higher value
/// is more severe, and result collections sort critical first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info = 0,
    Warning = 1,
    Critical = 2,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Broad grouping of issue kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Performance,
    Security,
    Integrity,
    Configuration,
}

// ============================================================================
// Suggestion
// ============================================================================

/// Remediation suggestion: a template key plus the values needed to render it
///
/// Rendering itself happens host-side; this core only assembles the key and
/// the context map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub template_key: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl Suggestion {
    pub fn new(template_key: impl Into<String>) -> Self {
        Self {
            template_key: template_key.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Issue
// ============================================================================

/// A detected problem, produced by exactly one analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Stable machine key, e.g. `n_plus_one`
    #[serde(rename = "type")]
    pub issue_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: IssueCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    /// Every concrete SQL string that contributed to this finding
    #[serde(rename = "queries")]
    pub origin_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<BacktraceFrame>>,
    /// Dedup key for mapping/configuration issues (e.g. `User.orders`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_name: Option<String>,
}

impl Issue {
    pub fn new(
        issue_type: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: IssueCategory,
    ) -> Self {
        Self {
            issue_type: issue_type.into(),
            title: title.into(),
            description: description.into(),
            severity,
            category,
            suggestion: None,
            origin_queries: Vec::new(),
            backtrace: None,
            setting_name: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_origin_queries(mut self, queries: Vec<String>) -> Self {
        self.origin_queries = queries;
        self
    }

    pub fn with_origin_query(mut self, query: impl Into<String>) -> Self {
        self.origin_queries.push(query.into());
        self
    }

    pub fn with_backtrace(mut self, frames: Vec<BacktraceFrame>) -> Self {
        self.backtrace = Some(frames);
        self
    }

    pub fn with_setting_name(mut self, setting: impl Into<String>) -> Self {
        self.setting_name = Some(setting.into());
        self
    }
}
