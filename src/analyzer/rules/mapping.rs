//! Association mapping analyzers
//!
//! These read the [`crate::model::MappingRecord`]s the host supplies
//! alongside the trace; they never look at SQL. Issues carry
//! `setting_name` so repeats across runs collapse to one finding per
//! mapping.

use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::model::{
    AssociationKind, CascadeAction, Issue, IssueCategory, MappingRecord, Severity, Suggestion,
};

// ============================================================================
// cascade_remove
// ============================================================================

/// Remove cascades on collection associations
///
/// Deleting one owner row then fans out to every row of the collection;
/// fine for small compositions, destructive for wide ones.
pub struct CascadeRemoveAnalyzer;

impl Analyzer for CascadeRemoveAnalyzer {
    fn id(&self) -> &'static str {
        "cascade_remove"
    }
    fn name(&self) -> &'static str {
        "Remove cascade on collections"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Integrity
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        ctx.mappings
            .iter()
            .filter(|m| m.kind.is_to_many() && m.cascades(CascadeAction::Remove))
            .map(|mapping| {
                Issue::new(
                    "cascade_remove",
                    format!("Remove cascade on collection {}", mapping.setting_name()),
                    format!(
                        "Deleting a {} row also deletes every row reachable through {}. A \
                         wide collection turns one DELETE into many; confirm the rows are \
                         truly owned by the parent.",
                        mapping.entity, mapping.field
                    ),
                    Severity::Warning,
                    self.category(),
                )
                .with_setting_name(mapping.setting_name())
                .with_suggestion(
                    Suggestion::new("cascade_remove.review")
                        .with("entity", &mapping.entity)
                        .with("field", &mapping.field),
                )
            })
            .collect()
    }
}

// ============================================================================
// orphan_removal
// ============================================================================

/// Orphan removal where it deletes shared rows or duplicates a cascade
pub struct OrphanRemovalAnalyzer;

impl Analyzer for OrphanRemovalAnalyzer {
    fn id(&self) -> &'static str {
        "orphan_removal"
    }
    fn name(&self) -> &'static str {
        "Orphan removal configuration"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Configuration
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for mapping in ctx.mappings.iter().filter(|m| m.orphan_removal) {
            if mapping.kind == AssociationKind::ManyToMany {
                issues.push(
                    Issue::new(
                        "orphan_removal",
                        format!("Orphan removal on many-to-many {}", mapping.setting_name()),
                        format!(
                            "{} is many-to-many, so the rows behind it can be referenced \
                             from other owners. Orphan removal deletes them as soon as one \
                             side detaches, breaking the other side's references.",
                            mapping.setting_name()
                        ),
                        Severity::Warning,
                        self.category(),
                    )
                    .with_setting_name(mapping.setting_name())
                    .with_suggestion(
                        Suggestion::new("orphan_removal.drop_flag")
                            .with("entity", &mapping.entity)
                            .with("field", &mapping.field),
                    ),
                );
            } else if mapping.cascades(CascadeAction::Remove) {
                issues.push(
                    Issue::new(
                        "orphan_removal",
                        format!("Orphan removal duplicates Remove cascade on {}", mapping.setting_name()),
                        format!(
                            "{} declares both orphan removal and a Remove cascade. Orphan \
                             removal already deletes detached children, so the cascade adds \
                             nothing but reading confusion.",
                            mapping.setting_name()
                        ),
                        Severity::Info,
                        self.category(),
                    )
                    .with_setting_name(mapping.setting_name())
                    .with_suggestion(
                        Suggestion::new("orphan_removal.drop_cascade")
                            .with("entity", &mapping.entity)
                            .with("field", &mapping.field),
                    ),
                );
            }
        }
        issues
    }
}

// ============================================================================
// missing_cascade_persist
// ============================================================================

/// Collections that require persisting each child by hand
pub struct MissingCascadePersistAnalyzer;

impl Analyzer for MissingCascadePersistAnalyzer {
    fn id(&self) -> &'static str {
        "missing_cascade_persist"
    }
    fn name(&self) -> &'static str {
        "Missing persist cascade on collections"
    }
    fn category(&self) -> IssueCategory {
        IssueCategory::Configuration
    }

    fn analyze(&self, ctx: &AnalyzerContext<'_>) -> Vec<Issue> {
        ctx.mappings
            .iter()
            .filter(|m| m.kind.is_to_many() && !m.cascades(CascadeAction::Persist))
            .map(|mapping| {
                Issue::new(
                    "missing_cascade_persist",
                    format!("No persist cascade on collection {}", mapping.setting_name()),
                    format!(
                        "New entities added to {} are not persisted with their parent; a \
                         flush with unsaved children fails or silently drops them. Add a \
                         Persist cascade or persist children explicitly.",
                        mapping.setting_name()
                    ),
                    Severity::Info,
                    self.category(),
                )
                .with_setting_name(mapping.setting_name())
                .with_suggestion(
                    Suggestion::new("missing_cascade_persist.add_cascade")
                        .with("entity", &mapping.entity)
                        .with("field", &mapping.field),
                )
            })
            .collect()
    }
}

/// Mapping analyzers in evaluation order
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(CascadeRemoveAnalyzer),
        Box::new(OrphanRemovalAnalyzer),
        Box::new(MissingCascadePersistAnalyzer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::model::QueryTrace;
    use crate::sql::SqlCache;

    fn run(analyzer: &dyn Analyzer, mappings: &[MappingRecord]) -> Vec<Issue> {
        let trace = QueryTrace::new();
        let config = AnalysisConfig::default();
        let cache = SqlCache::new(16);
        let ctx = AnalyzerContext::new(&trace, mappings, &config, &cache);
        analyzer.analyze(&ctx)
    }

    #[test]
    fn test_remove_cascade_on_collection_flagged() {
        let mappings = vec![
            MappingRecord::new("User", "orders", AssociationKind::OneToMany)
                .with_cascade(vec![CascadeAction::Remove]),
        ];
        let issues = run(&CascadeRemoveAnalyzer, &mappings);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "cascade_remove");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].category, IssueCategory::Integrity);
        assert_eq!(issues[0].setting_name.as_deref(), Some("User.orders"));
    }

    #[test]
    fn test_cascade_all_counts_as_remove() {
        let mappings = vec![
            MappingRecord::new("User", "orders", AssociationKind::OneToMany)
                .with_cascade(vec![CascadeAction::All]),
        ];
        assert_eq!(run(&CascadeRemoveAnalyzer, &mappings).len(), 1);
    }

    #[test]
    fn test_remove_cascade_on_to_one_not_flagged() {
        let mappings = vec![
            MappingRecord::new("Order", "customer", AssociationKind::ManyToOne)
                .with_cascade(vec![CascadeAction::Remove]),
        ];
        assert!(run(&CascadeRemoveAnalyzer, &mappings).is_empty());
    }

    #[test]
    fn test_orphan_removal_on_many_to_many_is_warning() {
        let mappings = vec![
            MappingRecord::new("Post", "tags", AssociationKind::ManyToMany)
                .with_orphan_removal(true),
        ];
        let issues = run(&OrphanRemovalAnalyzer, &mappings);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].category, IssueCategory::Configuration);
    }

    #[test]
    fn test_orphan_removal_with_remove_cascade_is_redundant() {
        let mappings = vec![
            MappingRecord::new("User", "orders", AssociationKind::OneToMany)
                .with_orphan_removal(true)
                .with_cascade(vec![CascadeAction::Remove]),
        ];
        let issues = run(&OrphanRemovalAnalyzer, &mappings);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert!(issues[0].title.contains("duplicates"));
    }

    #[test]
    fn test_plain_orphan_removal_on_one_to_many_is_fine() {
        let mappings = vec![
            MappingRecord::new("User", "orders", AssociationKind::OneToMany)
                .with_orphan_removal(true),
        ];
        assert!(run(&OrphanRemovalAnalyzer, &mappings).is_empty());
    }

    #[test]
    fn test_collection_without_persist_cascade_flagged() {
        let mappings = vec![MappingRecord::new("User", "orders", AssociationKind::OneToMany)];
        let issues = run(&MissingCascadePersistAnalyzer, &mappings);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "missing_cascade_persist");
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_persist_and_all_cascades_satisfy() {
        let mappings = vec![
            MappingRecord::new("User", "orders", AssociationKind::OneToMany)
                .with_cascade(vec![CascadeAction::Persist]),
            MappingRecord::new("User", "roles", AssociationKind::ManyToMany)
                .with_cascade(vec![CascadeAction::All]),
        ];
        assert!(run(&MissingCascadePersistAnalyzer, &mappings).is_empty());
    }

    #[test]
    fn test_to_one_never_needs_persist_cascade() {
        let mappings = vec![MappingRecord::new("Order", "customer", AssociationKind::ManyToOne)];
        assert!(run(&MissingCascadePersistAnalyzer, &mappings).is_empty());
    }
}
