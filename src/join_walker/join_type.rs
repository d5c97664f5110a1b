//! Join type resolution.
//!
//! Walkers differ from each other only in how they pick the join type of an edge
//! and in how they detect duplicates, so both rules are injected into the single
//! [`super::planner::JoinPlanner`] traversal as trait objects.

use std::fmt;

use super::association::JoinType;
use crate::persister_catalog::Cardinality;

/// Limits applied while walking. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchLimits {
    pub max_fetch_depth: Option<usize>,
    pub max_collection_fetches: Option<usize>,
}

impl FetchLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_too_deep(&self, depth: usize) -> bool {
        self.max_fetch_depth.is_some_and(|max| depth >= max)
    }

    pub fn is_too_many_collections(&self, fetched: usize) -> bool {
        self.max_collection_fetches.is_some_and(|max| fetched >= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathStep {
    join_type: JoinType,
    /// Entity type reached by the step; join tables carry none
    entity: Option<String>,
    property: String,
}

/// The chain of joins from the root to the node being walked.
///
/// Owned by one `plan` invocation and pushed/popped as the walk descends.
#[derive(Debug, Clone, Default)]
pub struct WalkPath {
    root_entity: Option<String>,
    steps: Vec<PathStep>,
    collections_fetched: usize,
}

impl WalkPath {
    pub fn new(root_entity: Option<&str>) -> Self {
        WalkPath {
            root_entity: root_entity.map(str::to_string),
            steps: Vec::new(),
            collections_fetched: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// True when every join on the path so far is non-outer.
    pub fn all_inner(&self) -> bool {
        self.steps.iter().all(|s| !s.join_type.is_outer())
    }

    pub fn contains_type(&self, entity: &str) -> bool {
        self.root_entity.as_deref() == Some(entity)
            || self.steps.iter().any(|s| s.entity.as_deref() == Some(entity))
    }

    /// Dotted property path of `property` below the current node.
    pub fn property_path(&self, property: &str) -> String {
        let mut parts: Vec<&str> = self
            .steps
            .iter()
            .map(|s| s.property.as_str())
            .filter(|p| !p.is_empty())
            .collect();
        if !property.is_empty() {
            parts.push(property);
        }
        parts.join(".")
    }

    /// Dotted property path of the current node.
    pub fn current_path(&self) -> String {
        self.property_path("")
    }

    pub fn collections_fetched(&self) -> usize {
        self.collections_fetched
    }

    pub(crate) fn record_collection_fetch(&mut self) {
        self.collections_fetched += 1;
    }

    pub(crate) fn push(&mut self, property: &str, join_type: JoinType, entity: Option<&str>) {
        self.steps.push(PathStep {
            join_type,
            entity: entity.map(str::to_string),
            property: property.to_string(),
        });
    }

    pub(crate) fn pop(&mut self) {
        self.steps.pop();
    }
}

/// An association the walker is considering joining.
#[derive(Debug, Clone, Copy)]
pub struct JoinCandidate<'a> {
    pub property_path: &'a str,
    pub cardinality: Cardinality,
    pub nullable: bool,
    /// The join from a many-to-many join table to its element entity
    pub element_join: bool,
}

pub trait JoinTypeResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, candidate: &JoinCandidate<'_>, path: &WalkPath, depth: usize) -> JoinType;
}

/// Standard rule: INNER for a non-nullable association reached only through
/// non-outer joins, LEFT OUTER otherwise, NONE beyond the fetch limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct OuterJoinResolver {
    pub limits: FetchLimits,
}

impl OuterJoinResolver {
    pub fn new(limits: FetchLimits) -> Self {
        OuterJoinResolver { limits }
    }
}

impl JoinTypeResolver for OuterJoinResolver {
    fn resolve(&self, candidate: &JoinCandidate<'_>, path: &WalkPath, depth: usize) -> JoinType {
        if self.limits.is_too_deep(depth) {
            return JoinType::None;
        }
        if candidate.cardinality.is_collection()
            && self.limits.is_too_many_collections(path.collections_fetched())
        {
            return JoinType::None;
        }
        if !candidate.nullable && path.all_inner() {
            JoinType::Inner
        } else {
            JoinType::LeftOuter
        }
    }
}

/// Rule for walks rooted at a many-to-many collection or a collection of values:
/// the root-level element join only has rows where the join matches, so it is
/// always INNER. References held by composite elements and deeper edges follow
/// the standard rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionRootResolver {
    pub standard: OuterJoinResolver,
}

impl CollectionRootResolver {
    pub fn new(limits: FetchLimits) -> Self {
        CollectionRootResolver {
            standard: OuterJoinResolver::new(limits),
        }
    }
}

impl JoinTypeResolver for CollectionRootResolver {
    fn resolve(&self, candidate: &JoinCandidate<'_>, path: &WalkPath, depth: usize) -> JoinType {
        if candidate.element_join && depth == 0 && path.depth() == 0 {
            return JoinType::Inner;
        }
        self.standard.resolve(candidate, path, depth)
    }
}
