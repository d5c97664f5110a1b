//! Join plan model.
//!
//! A [`JoinPlan`] is the ordered list of association edges chosen by the planner
//! for one compiled statement. Edge order is discovery order; rendering, alias
//! numbering and suffix numbering all follow it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::persister_catalog::Cardinality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Not joined at all
    None,
    Inner,
    LeftOuter,
}

impl JoinType {
    pub fn is_outer(&self) -> bool {
        matches!(self, JoinType::LeftOuter)
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::None => "",
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::None => write!(f, "NONE"),
            JoinType::Inner => write!(f, "INNER"),
            JoinType::LeftOuter => write!(f, "LEFT_OUTER"),
        }
    }
}

/// Uniquely identifies a foreign key so it is never joined twice in one plan.
///
/// The key is taken on the side that holds the foreign key: for a many-to-one it
/// is the owner's table and columns, for a collection it is the collection table
/// and its key columns. Both directions of a bidirectional association therefore
/// produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationKey {
    pub table: String,
    pub columns: Vec<String>,
}

impl AssociationKey {
    pub fn new(table: impl Into<String>, columns: &[String]) -> Self {
        AssociationKey {
            table: table.into(),
            columns: columns.to_vec(),
        }
    }
}

impl fmt::Display for AssociationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.table, self.columns.join(", "))
    }
}

/// Columns a joined (or root) table contributes to the SELECT list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectShape {
    /// An entity row; consumes one entity suffix
    Entity { columns: Vec<String> },
    /// A collection row (values or a many-to-many join table); consumes one collection suffix
    Collection { columns: Vec<String> },
    /// A one-to-many collection whose rows are the element entity's rows;
    /// consumes one suffix of each kind
    CollectionOfEntities {
        collection_columns: Vec<String>,
        entity_columns: Vec<String>,
    },
}

impl SelectShape {
    pub fn consumes_entity_suffix(&self) -> bool {
        matches!(
            self,
            SelectShape::Entity { .. } | SelectShape::CollectionOfEntities { .. }
        )
    }

    pub fn consumes_collection_suffix(&self) -> bool {
        matches!(
            self,
            SelectShape::Collection { .. } | SelectShape::CollectionOfEntities { .. }
        )
    }
}

/// `source_alias.lhs = target_alias.rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub lhs: String,
    pub rhs: String,
}

impl JoinColumn {
    pub fn pair(lhs: &[String], rhs: &[String]) -> Vec<JoinColumn> {
        lhs.iter()
            .zip(rhs)
            .map(|(l, r)| JoinColumn {
                lhs: l.clone(),
                rhs: r.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationEdge {
    pub index: usize,
    /// Dotted property path from the root (`customer.address`)
    pub property_path: String,
    pub source_alias: String,
    pub target_alias: String,
    /// Entity name or collection role reached by this edge
    pub target_name: String,
    pub target_table: String,
    pub join_columns: Vec<JoinColumn>,
    pub key: AssociationKey,
    pub cardinality: Cardinality,
    pub nullable: bool,
    pub join_type: JoinType,
    pub depth: usize,
    /// Element join of a many-to-many collection (join table -> element entity)
    pub is_many_to_many: bool,
    /// Collection role owning this element join, when `is_many_to_many`
    pub many_to_many_role: Option<String>,
    /// Collection-to-owner join appended at the end of a collection walk
    pub synthetic_owner: bool,
    /// Filter conditions already rendered against `target_alias`
    pub filter_fragment: Option<String>,
    /// Ordering already rendered against `target_alias`
    pub order_fragment: Option<String>,
    pub shape: SelectShape,
}

/// What the plan is rooted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootKind {
    Entity,
    OneToMany,
    ManyToMany,
    CollectionOfValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRoot {
    pub kind: RootKind,
    /// Entity name or collection role
    pub name: String,
    pub alias: String,
    pub table: String,
    /// Columns the key predicate binds against
    pub key_columns: Vec<String>,
    pub shape: SelectShape,
    pub filter_fragment: Option<String>,
    pub order_fragment: Option<String>,
}

/// Target-side fragments of a many-to-many collection.
///
/// These reference the element entity's table, whose alias is only known once
/// the element join has been located in the plan; templates keep the `{alias}`
/// placeholder until the statement is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManyToManyFragments {
    pub role: String,
    pub element_entity: String,
    /// Alias of the join table the element join starts from
    pub collection_alias: String,
    pub filter_template: Option<String>,
    pub order_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub root: PlanRoot,
    pub edges: Vec<AssociationEdge>,
    pub many_to_many: Vec<ManyToManyFragments>,
}

impl JoinPlan {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_by_alias(&self, alias: &str) -> Option<&AssociationEdge> {
        self.edges.iter().find(|e| e.target_alias == alias)
    }

    /// Index of the edge whose target this edge starts from; `None` for edges
    /// leaving the root.
    pub fn owner_of(&self, index: usize) -> Option<usize> {
        let edge = self.edges.get(index)?;
        self.edges[..index]
            .iter()
            .position(|e| e.target_alias == edge.source_alias)
    }

    /// Locate the element join of a many-to-many collection: the edge leaving the
    /// collection alias towards the element entity.
    pub fn many_to_many_element_edge(
        &self,
        collection_alias: &str,
        element_entity: &str,
    ) -> Option<&AssociationEdge> {
        self.edges.iter().find(|e| {
            e.is_many_to_many
                && e.source_alias == collection_alias
                && e.target_name == element_entity
        })
    }

    /// Number of entity-shaped nodes, root included.
    pub fn entity_node_count(&self) -> usize {
        std::iter::once(&self.root.shape)
            .chain(self.edges.iter().map(|e| &e.shape))
            .filter(|s| s.consumes_entity_suffix())
            .count()
    }

    /// Number of collection-shaped nodes, root included.
    pub fn collection_node_count(&self) -> usize {
        std::iter::once(&self.root.shape)
            .chain(self.edges.iter().map(|e| &e.shape))
            .filter(|s| s.consumes_collection_suffix())
            .count()
    }
}
