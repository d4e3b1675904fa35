//! Entity mapping metadata
//!
//! Integrity analyzers consume association records supplied by the host's
//! metadata layer; this crate never reads ORM annotations itself.

use serde::{Deserialize, Serialize};

/// Association kind between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl AssociationKind {
    /// True for associations whose field holds a collection
    pub fn is_to_many(&self) -> bool {
        matches!(self, AssociationKind::OneToMany | AssociationKind::ManyToMany)
    }
}

/// Cascade operation configured on an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    Persist,
    Remove,
    Merge,
    Detach,
    Refresh,
    All,
}

/// One association mapping as declared on an entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    pub entity: String,
    pub field: String,
    pub kind: AssociationKind,
    #[serde(default)]
    pub cascade: Vec<CascadeAction>,
    #[serde(default)]
    pub orphan_removal: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

impl MappingRecord {
    pub fn new(
        entity: impl Into<String>,
        field: impl Into<String>,
        kind: AssociationKind,
    ) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            kind,
            cascade: Vec::new(),
            orphan_removal: false,
            nullable: false,
            column_type: None,
        }
    }

    pub fn with_cascade(mut self, actions: Vec<CascadeAction>) -> Self {
        self.cascade = actions;
        self
    }

    pub fn with_orphan_removal(mut self, enabled: bool) -> Self {
        self.orphan_removal = enabled;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Dedup key for issues about this mapping, e.g. `User.orders`
    pub fn setting_name(&self) -> String {
        format!("{}.{}", self.entity, self.field)
    }

    /// Whether the given cascade action applies, directly or via `All`
    pub fn cascades(&self, action: CascadeAction) -> bool {
        self.cascade.contains(&action) || self.cascade.contains(&CascadeAction::All)
    }
}
