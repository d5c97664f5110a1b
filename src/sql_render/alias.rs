//! Table alias and column suffix allocation.
//!
//! ## Aliases
//! Format: `{root}{n}_` where `root` is derived from the entity name or collection
//! role and `n` is 0 for the plan root and `edge index + 1` for each joined table.
//!
//! The root is the unqualified name (text after the last `.`), truncated to 10
//! characters, lower-cased, with `/` and `$` mapped to `_` and any leading
//! non-letters stripped. A root ending in a digit gets an `x` appended so the
//! numeric part can always be read back unambiguously.
//!
//! Examples:
//! - `("Order", 0)` → `"order0_"`
//! - `("Order.lines", 2)` → `"lines2_"`
//! - `("com.shop.CustomerAccount", 1)` → `"customerac1_"`
//!
//! ## Suffixes
//! Suffixes (`"0_"`, `"1_"`, …) are appended to column aliases so that columns
//! with the same name in different joined tables stay distinct in one result row.
//! Entity-shaped and collection-shaped tables draw from two independent sequences,
//! which may overlap textually; a suffix is therefore always carried together
//! with its [`SuffixKind`].

use serde::{Deserialize, Serialize};

use crate::join_walker::association::JoinPlan;

const ALIAS_TRUNCATE_LENGTH: usize = 10;

/// Generate an alias for `description` with the uniquing number `unique`.
///
/// # Examples
/// ```
/// use joinwalker::sql_render::alias::generate_alias;
///
/// assert_eq!(generate_alias("Order", 0), "order0_");
/// assert_eq!(generate_alias("Order.lines", 2), "lines2_");
/// assert_eq!(generate_alias("Address2", 1), "address2x1_");
/// ```
pub fn generate_alias(description: &str, unique: usize) -> String {
    format!("{}{}_", alias_root(description), unique)
}

fn alias_root(description: &str) -> String {
    let unqualified = description.rsplit('.').next().unwrap_or(description);
    let truncated: String = unqualified.chars().take(ALIAS_TRUNCATE_LENGTH).collect();
    let cleaned: String = truncated
        .to_lowercase()
        .chars()
        .map(|c| if c == '/' || c == '$' { '_' } else { c })
        .skip_while(|c| !c.is_alphabetic())
        .collect();

    // Names with no letters at all still need a usable alias
    let root = if cleaned.is_empty() {
        "t".to_string()
    } else {
        cleaned
    };

    if root.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{}x", root)
    } else {
        root
    }
}

/// `count` suffixes starting at `seed`: `["{seed}_", "{seed+1}_", …]`
pub fn generate_suffixes(seed: usize, count: usize) -> Vec<String> {
    (seed..seed + count).map(|n| format!("{}_", n)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuffixKind {
    Entity,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSuffix {
    pub kind: SuffixKind,
    pub tag: String,
}

impl ColumnSuffix {
    /// Column alias used in the SELECT list: `{column}_{tag}`.
    pub fn column_alias(&self, column: &str) -> String {
        format!("{}_{}", column, self.tag)
    }
}

/// Hands out aliases while the planner discovers edges.
///
/// Edge aliases must be allocated in edge order; the allocator records them so
/// the resulting alias table is a bijection between edge index and alias.
#[derive(Debug, Clone, Default)]
pub struct AliasAllocator {
    edges: Vec<String>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root alias, derived deterministically from the role (or entity) name.
    pub fn root_alias(&self, role: &str) -> String {
        generate_alias(role, 0)
    }

    /// Alias for the edge at `edge_index`, reaching the table named by `name`.
    pub fn allocate(&mut self, edge_index: usize, name: &str) -> String {
        debug_assert_eq!(edge_index, self.edges.len(), "edge aliases allocated out of order");
        let alias = generate_alias(name, edge_index + 1);
        self.edges.push(alias.clone());
        alias
    }

    pub fn entity_suffixes(count: usize) -> Vec<ColumnSuffix> {
        generate_suffixes(0, count)
            .into_iter()
            .map(|tag| ColumnSuffix {
                kind: SuffixKind::Entity,
                tag,
            })
            .collect()
    }

    pub fn collection_suffixes(start: usize, count: usize) -> Vec<ColumnSuffix> {
        generate_suffixes(start, count)
            .into_iter()
            .map(|tag| ColumnSuffix {
                kind: SuffixKind::Collection,
                tag,
            })
            .collect()
    }
}

/// Suffixes assigned to one plan node (root or edge target).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSuffixes {
    pub entity: Option<ColumnSuffix>,
    pub collection: Option<ColumnSuffix>,
}

/// Aliases and suffixes of one compiled statement.
///
/// Handed to row hydration together with the SQL so that each result row can be
/// sliced back into per-entity and per-collection column groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    root_alias: String,
    edge_aliases: Vec<String>,
    root_suffixes: NodeSuffixes,
    edge_suffixes: Vec<NodeSuffixes>,
    entity_suffixes: Vec<ColumnSuffix>,
    collection_suffixes: Vec<ColumnSuffix>,
}

impl AliasTable {
    /// Assign suffixes to the plan's nodes in plan order.
    ///
    /// Entity suffixes start at 0; collection suffixes start right after the last
    /// entity suffix number so both sequences stay readable in the SQL text.
    pub fn from_plan(plan: &JoinPlan) -> Self {
        let entity_count = plan.entity_node_count();
        let collection_count = plan.collection_node_count();
        let entity_suffixes = AliasAllocator::entity_suffixes(entity_count);
        let collection_suffixes = AliasAllocator::collection_suffixes(entity_count, collection_count);

        let mut next_entity = entity_suffixes.iter();
        let mut next_collection = collection_suffixes.iter();
        let mut assign = |shape: &crate::join_walker::association::SelectShape| NodeSuffixes {
            entity: if shape.consumes_entity_suffix() {
                next_entity.next().cloned()
            } else {
                None
            },
            collection: if shape.consumes_collection_suffix() {
                next_collection.next().cloned()
            } else {
                None
            },
        };

        let root_suffixes = assign(&plan.root.shape);
        let edge_suffixes: Vec<NodeSuffixes> = plan.edges.iter().map(|e| assign(&e.shape)).collect();

        AliasTable {
            root_alias: plan.root.alias.clone(),
            edge_aliases: plan.edges.iter().map(|e| e.target_alias.clone()).collect(),
            root_suffixes,
            edge_suffixes,
            entity_suffixes,
            collection_suffixes,
        }
    }

    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    pub fn alias_of(&self, edge_index: usize) -> Option<&str> {
        self.edge_aliases.get(edge_index).map(String::as_str)
    }

    /// Root alias followed by every edge alias, in plan order.
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.root_alias.as_str()).chain(self.edge_aliases.iter().map(String::as_str))
    }

    pub fn root_suffixes(&self) -> &NodeSuffixes {
        &self.root_suffixes
    }

    pub fn suffixes_of(&self, edge_index: usize) -> Option<&NodeSuffixes> {
        self.edge_suffixes.get(edge_index)
    }

    pub fn entity_suffixes(&self) -> &[ColumnSuffix] {
        &self.entity_suffixes
    }

    pub fn collection_suffixes(&self) -> &[ColumnSuffix] {
        &self.collection_suffixes
    }
}
