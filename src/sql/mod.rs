//! SQL understanding layer
//!
//! Three cooperating pieces:
//! - `structure`: grammar-based extraction of tables, joins, conditions
//!   and clauses into a [`StructuralQuery`], with a regex fallback for
//!   text the grammar rejects
//! - `normalize`: literal-insensitive signature used to group queries
//!   that differ only in bound values
//! - `cache`: bounded memoization of both, keyed by SQL text

pub mod cache;
pub(crate) mod fallback;
pub mod normalize;
pub mod structure;

pub use cache::SqlCache;
pub use normalize::normalize;
pub use structure::{
    JoinClause, JoinKind, StatementKind, StructuralQuery, TableRef, WhereCondition, extract,
};
