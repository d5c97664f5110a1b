//! SQL text generation for join plans.
//!
//! [`alias`] numbers tables and column groups, [`key_predicate`] renders the
//! key restriction of a loader, and [`assembler`] combines both with a
//! [`crate::join_walker::JoinPlan`] into a [`statement::SelectStatement`].

pub mod alias;
pub mod assembler;
pub mod key_predicate;
pub mod statement;

pub use alias::{generate_alias, AliasAllocator, AliasTable, ColumnSuffix, NodeSuffixes, SuffixKind};
pub use assembler::{StatementAssembler, StatementParts};
pub use key_predicate::KeyPredicate;
pub use statement::SelectStatement;

pub trait ToSql {
    fn to_sql(&self) -> String;
}
