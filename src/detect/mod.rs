//! Query shape detectors
//!
//! Small, stateless predicates over a query's structural view. Each one
//! answers "does this query have shape X" and nothing more; thresholds,
//! grouping, and severity all live in the analyzers that call them.
//! Detectors never fail on malformed input because they only consume the
//! already-degraded [`StructuralQuery`].

pub mod builder;
pub mod injection;

use crate::sql::StructuralQuery;

/// Status and boolean literals common enough in WHERE clauses that they
/// carry no signal for the literal-based checks
pub const SAFE_LITERALS: [&str; 16] = [
    "active",
    "pending",
    "inactive",
    "deleted",
    "draft",
    "published",
    "true",
    "false",
    "yes",
    "no",
    "on",
    "off",
    "asc",
    "desc",
    "0",
    "1",
];

pub fn is_safe_literal(value: &str) -> bool {
    let trimmed = value.trim();
    SAFE_LITERALS
        .iter()
        .any(|safe| safe.eq_ignore_ascii_case(trimmed))
}

/// Foreign-key lookup shape found by [`detect_n_plus_one_pattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkLookup {
    pub table: String,
    pub foreign_key_column: String,
}

/// Single-row lookup by foreign key: `SELECT ... FROM t WHERE x_id = ?`
/// with a single-table FROM. This is the repeated unit of an N+1 burst
/// where the related row is fetched once per parent.
pub fn detect_n_plus_one_pattern(structure: &StructuralQuery) -> Option<FkLookup> {
    if !structure.joins.is_empty() {
        return None;
    }
    let table = structure.main_table.as_ref()?.name.clone();
    structure
        .where_conditions
        .iter()
        .find(|condition| {
            condition.operator == "="
                && condition.literal_value.is_some()
                && is_foreign_key_column(&condition.column)
        })
        .map(|condition| FkLookup {
            table,
            foreign_key_column: condition.column.clone(),
        })
}

/// Single-entity lookup by primary key: WHERE is exactly `id = ?` (or a
/// literal), no joins. Repeated occurrences point at lazy loading rather
/// than an FK fan-out, so it is routed separately from the FK shape.
pub fn detect_lazy_loading_pattern(structure: &StructuralQuery) -> Option<String> {
    if !structure.joins.is_empty() {
        return None;
    }
    let table = structure.main_table.as_ref()?.name.clone();
    let [condition] = structure.where_conditions.as_slice() else {
        return None;
    };
    if condition.column.eq_ignore_ascii_case("id")
        && condition.operator == "="
        && condition.literal_value.is_some()
    {
        Some(table)
    } else {
        None
    }
}

/// Collection lazy-load with pagination: FK WHERE shape plus a LIMIT
pub fn detect_partial_collection_load(structure: &StructuralQuery) -> bool {
    structure.has_limit && detect_n_plus_one_pattern(structure).is_some()
}

fn is_foreign_key_column(column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    lower.ends_with("_id") && lower != "_id"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;

    #[test]
    fn test_fk_lookup_shape() {
        let structure = sql::extract("SELECT * FROM comments WHERE post_id = ?");
        let found = detect_n_plus_one_pattern(&structure);
        assert_eq!(
            found,
            Some(FkLookup {
                table: "comments".to_string(),
                foreign_key_column: "post_id".to_string(),
            })
        );
    }

    #[test]
    fn test_fk_lookup_rejects_joined_query() {
        let structure = sql::extract(
            "SELECT * FROM comments c JOIN posts p ON p.id = c.post_id WHERE c.post_id = ?",
        );
        assert!(detect_n_plus_one_pattern(&structure).is_none());
    }

    #[test]
    fn test_fk_lookup_rejects_column_to_column() {
        let structure = sql::extract("SELECT * FROM comments WHERE post_id = parent_id");
        assert!(detect_n_plus_one_pattern(&structure).is_none());
    }

    #[test]
    fn test_lazy_loading_shape() {
        let structure = sql::extract("SELECT * FROM users WHERE id = 42");
        assert_eq!(
            detect_lazy_loading_pattern(&structure),
            Some("users".to_string())
        );
    }

    #[test]
    fn test_lazy_loading_is_not_the_fk_shape() {
        let by_pk = sql::extract("SELECT * FROM users WHERE id = ?");
        assert!(detect_n_plus_one_pattern(&by_pk).is_none());
        let by_fk = sql::extract("SELECT * FROM users WHERE team_id = ?");
        assert!(detect_lazy_loading_pattern(&by_fk).is_none());
    }

    #[test]
    fn test_lazy_loading_requires_lone_condition() {
        let structure = sql::extract("SELECT * FROM users WHERE id = ? AND status = 'active'");
        assert!(detect_lazy_loading_pattern(&structure).is_none());
    }

    #[test]
    fn test_partial_collection_load() {
        let paged = sql::extract("SELECT * FROM comments WHERE post_id = ? LIMIT 10");
        assert!(detect_partial_collection_load(&paged));
        let unpaged = sql::extract("SELECT * FROM comments WHERE post_id = ?");
        assert!(!detect_partial_collection_load(&unpaged));
    }

    #[test]
    fn test_safe_literal_allowlist() {
        assert!(is_safe_literal("active"));
        assert!(is_safe_literal("ACTIVE"));
        assert!(is_safe_literal(" 1 "));
        assert!(!is_safe_literal("1 OR 1=1"));
        assert!(!is_safe_literal("admin"));
    }
}
