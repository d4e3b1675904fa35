//! Issue collection
//!
//! Ordered, analyzer-agnostic container over [`Issue`] with the derived
//! operations the engine and host need. All operations return new values.

use super::issue::{Issue, IssueCategory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered container of issues from one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueCollection {
    issues: Vec<Issue>,
}

impl IssueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: IssueCollection) {
        self.issues.extend(other.issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }

    /// New collection containing only issues at the given severity
    pub fn filter_by_severity(&self, severity: Severity) -> IssueCollection {
        IssueCollection {
            issues: self
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .cloned()
                .collect(),
        }
    }

    /// New collection containing only issues of the given type key
    pub fn filter_by_type(&self, issue_type: &str) -> IssueCollection {
        IssueCollection {
            issues: self
                .issues
                .iter()
                .filter(|i| i.issue_type == issue_type)
                .cloned()
                .collect(),
        }
    }

    /// Group issues by category, preserving relative order inside each group
    pub fn group_by_category(&self) -> BTreeMap<IssueCategory, IssueCollection> {
        let mut groups: BTreeMap<IssueCategory, IssueCollection> = BTreeMap::new();
        for issue in &self.issues {
            groups.entry(issue.category).or_default().push(issue.clone());
        }
        groups
    }

    /// Issue counts per severity
    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_insert(0) += 1;
        }
        counts
    }

    /// New collection sorted critical first, stable within each tier
    pub fn sorted_by_severity(&self) -> IssueCollection {
        let mut issues = self.issues.clone();
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        IssueCollection { issues }
    }

    /// The most severe issue; first occurrence wins on ties
    pub fn most_severe(&self) -> Option<&Issue> {
        let mut best: Option<&Issue> = None;
        for issue in &self.issues {
            match best {
                Some(current) if issue.severity <= current.severity => {}
                _ => best = Some(issue),
            }
        }
        best
    }

    /// Aggregate counts and a coarse health score for the pass
    pub fn summary(&self) -> TraceSummary {
        let mut critical = 0usize;
        let mut warning = 0usize;
        let mut info = 0usize;
        for issue in &self.issues {
            match issue.severity {
                Severity::Critical => critical += 1,
                Severity::Warning => warning += 1,
                Severity::Info => info += 1,
            }
        }

        let mut score: f64 = 100.0;
        score -= critical as f64 * 20.0;
        score -= warning as f64 * 10.0;
        score -= info as f64 * 3.0;

        TraceSummary {
            total_issues: self.issues.len(),
            critical,
            warning,
            info,
            health_score: score.max(0.0) as u32,
        }
    }
}

impl FromIterator<Issue> for IssueCollection {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self {
            issues: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for IssueCollection {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a> IntoIterator for &'a IssueCollection {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

/// Aggregate view of one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub total_issues: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    /// 100 minus severity-weighted penalties, floored at 0
    pub health_score: u32,
}
