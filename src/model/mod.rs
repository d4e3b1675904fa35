//! Data model: query traces, entity mappings, issues, and collections

pub mod collection;
pub mod issue;
pub mod mapping;
pub mod query;

pub use collection::{IssueCollection, TraceSummary};
pub use issue::{Issue, IssueCategory, Severity, Suggestion};
pub use mapping::{AssociationKind, CascadeAction, MappingRecord};
pub use query::{BacktraceFrame, QueryRecord, QueryTrace};
