//! # Mapping Error Types
//!
//! Errors raised when persister metadata is internally inconsistent. These are
//! configuration defects in the mapping, never transient conditions, so callers
//! should surface them immediately instead of retrying.
//!
//! ## Error Categories
//!
//! - **Lookup Errors**: an association names an entity or collection role that the
//!   catalog does not know
//! - **Shape Errors**: declared cardinality or join columns that do not fit the target
//! - **Rendering Errors**: a fragment that cannot be attached to any alias of the plan
//! - **File Errors**: mapping files that cannot be read or parsed
//!
//! ## Usage Patterns
//!
//! ```ignore
//! MappingError::entity_error_with_context(
//!     "Customer",
//!     "While walking association `Order.customer`"
//! )
//! ```

use thiserror::Error;

use super::persister::Cardinality;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("No entity persister found for `{entity}`.")]
    UnknownEntity { entity: String },

    #[error("No collection persister found for role `{role}`.")]
    UnknownCollection { role: String },

    #[error(
        "Association `{property}` declares cardinality {cardinality} which is not supported by its target `{target}`"
    )]
    UnsupportedCardinality {
        property: String,
        cardinality: Cardinality,
        target: String,
    },

    #[error(
        "Join column count mismatch on `{path}`: {lhs} foreign-key column(s) against {rhs} key column(s)"
    )]
    ColumnCountMismatch {
        path: String,
        lhs: usize,
        rhs: usize,
    },

    #[error("Many-to-many collection `{role}` has no element join in the plan; cannot attach its target-side fragments")]
    MissingManyToManyElementJoin { role: String },

    #[error("Entity `{entity}` declares no key columns")]
    MissingKeyColumns { entity: String },

    #[error("Failed to read mapping file: {error}")]
    MappingReadError { error: String },

    #[error("Failed to parse mapping file: {error}")]
    MappingParseError { error: String },

    #[error("Invalid mapping: {message}")]
    InvalidMapping { message: String },
}

impl MappingError {
    /// Create an UnknownEntity error carrying the operation that needed it
    pub fn entity_error_with_context(entity: impl Into<String>, context: impl Into<String>) -> Self {
        MappingError::UnknownEntity {
            entity: format!("{}\n  Context: {}", entity.into(), context.into()),
        }
    }

    /// Create an UnknownCollection error carrying the operation that needed it
    pub fn collection_error_with_context(
        role: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        MappingError::UnknownCollection {
            role: format!("{}\n  Context: {}", role.into(), context.into()),
        }
    }
}
