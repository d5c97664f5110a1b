//! Circularity detection for the join walk.
//!
//! Every appended edge records its [`AssociationKey`] in a per-invocation
//! [`VisitedAssociations`] accumulator. A candidate whose key is already present
//! would join the same foreign key twice, which is how mutual and
//! self-referencing mappings would otherwise recurse forever.

use std::collections::HashSet;
use std::fmt;

use super::association::AssociationKey;

#[derive(Debug, Clone, Default)]
pub struct VisitedAssociations {
    keys: HashSet<AssociationKey>,
}

impl VisitedAssociations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &AssociationKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns false when the key was already recorded.
    pub fn record(&mut self, key: AssociationKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub trait DuplicateAssociationGuard: Send + Sync + fmt::Debug {
    fn is_duplicate(&self, key: &AssociationKey, visited: &VisitedAssociations) -> bool;
}

/// Base rule: an association key may be joined once per plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisitedKeyGuard;

impl DuplicateAssociationGuard for VisitedKeyGuard {
    fn is_duplicate(&self, key: &AssociationKey, visited: &VisitedAssociations) -> bool {
        visited.contains(key)
    }
}

/// One-to-many walks start at the element entity. Joining back through the
/// association that defines the collection would re-fetch the owner from each
/// element row, so that key is always a duplicate.
#[derive(Debug, Clone)]
pub struct OneToManyGuard {
    collection_key: AssociationKey,
}

impl OneToManyGuard {
    pub fn new(collection_table: &str, key_columns: &[String]) -> Self {
        OneToManyGuard {
            collection_key: AssociationKey::new(collection_table, key_columns),
        }
    }
}

impl DuplicateAssociationGuard for OneToManyGuard {
    fn is_duplicate(&self, key: &AssociationKey, visited: &VisitedAssociations) -> bool {
        *key == self.collection_key || VisitedKeyGuard.is_duplicate(key, visited)
    }
}
