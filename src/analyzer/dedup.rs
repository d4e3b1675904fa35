//! Issue deduplication and final ordering
//!
//! Analyzers report the same underlying problem more than once: per
//! occurrence inside one analyzer, or from overlapping analyzers. Each
//! issue gets a dedup key (its type plus the setting name when present,
//! otherwise the normalized first origin query) and colliding issues
//! collapse to a single survivor. All tie-breaking compares content, not
//! arrival order, so shuffling the input multiset cannot change the
//! output. The final collection is sorted Critical, Warning, Info, with
//! dedup-key order inside each tier.

use crate::model::{Issue, IssueCollection};
use crate::sql::SqlCache;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Collapse duplicates and produce the final ranked collection
pub fn deduplicate(issues: IssueCollection, cache: &SqlCache) -> IssueCollection {
    let mut buckets: BTreeMap<(String, String), Issue> = BTreeMap::new();

    for issue in issues.into_vec() {
        let key = dedup_key(&issue, cache);
        match buckets.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(issue);
            }
            Entry::Occupied(mut slot) => {
                let merged = merge(slot.get(), &issue);
                slot.insert(merged);
            }
        }
    }

    // BTreeMap iteration gives key order; the stable sort then only moves
    // issues across severity tiers
    let mut ordered: Vec<Issue> = buckets.into_values().collect();
    ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
    IssueCollection::from_issues(ordered)
}

/// `(type, setting_name)` for configuration-style issues, otherwise
/// `(type, signature of the first origin query)`
fn dedup_key(issue: &Issue, cache: &SqlCache) -> (String, String) {
    if let Some(setting) = &issue.setting_name {
        return (issue.issue_type.clone(), setting.clone());
    }
    let signature = issue
        .origin_queries
        .first()
        .map(|sql| cache.signature(sql).as_ref().to_string())
        .unwrap_or_default();
    (issue.issue_type.clone(), signature)
}

/// Build the surviving issue for one collision. The winner contributes
/// title, description, severity and extras; the survivor carries the
/// ordered union of both origin sets.
fn merge(kept: &Issue, incoming: &Issue) -> Issue {
    let winner = if incoming_wins(incoming, kept) {
        incoming
    } else {
        kept
    };
    let loser = if std::ptr::eq(winner, kept) {
        incoming
    } else {
        kept
    };

    let mut origins = winner.origin_queries.clone();
    for sql in &loser.origin_queries {
        if !origins.contains(sql) {
            origins.push(sql.clone());
        }
    }
    winner.clone().with_origin_queries(origins)
}

fn incoming_wins(incoming: &Issue, kept: &Issue) -> bool {
    match incoming.severity.cmp(&kept.severity) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            match incoming
                .origin_queries
                .len()
                .cmp(&kept.origin_queries.len())
            {
                Ordering::Greater => true,
                Ordering::Less => false,
                // content comparison so input order cannot leak through
                Ordering::Equal => {
                    (&incoming.origin_queries, &incoming.title)
                        < (&kept.origin_queries, &kept.title)
                }
            }
        }
    }
}
