//! Analyzer roster
//!
//! One module per concern, each exporting `analyzers()`:
//! - `repetition`: n_plus_one, duplicate_query, partial_collection
//! - `efficiency`: slow_query, select_star, unbounded_result,
//!   leading_wildcard_like, offset_pagination, missing_index
//! - `join`: wasted_join, left_join_as_inner, excessive_joins
//! - `security`: injection_risk, builder_misuse
//! - `mapping`: cascade_remove, orphan_removal, missing_cascade_persist
//!
//! Registration is an explicit ordered list, no discovery mechanism. The
//! engine filters this list against the `enabled` config switches.

pub mod efficiency;
pub mod join;
pub mod mapping;
pub mod repetition;
pub mod security;

use super::Analyzer;

/// Every analyzer in registry order
pub fn all_analyzers() -> Vec<Box<dyn Analyzer>> {
    let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
    analyzers.extend(repetition::analyzers());
    analyzers.extend(efficiency::analyzers());
    analyzers.extend(join::analyzers());
    analyzers.extend(security::analyzers());
    analyzers.extend(mapping::analyzers());
    analyzers
}
