//! Turns a [`JoinPlan`] into a [`SelectStatement`].
//!
//! Clause contents, in order:
//! - SELECT: the root's columns, then each edge's columns in plan order
//! - FROM/JOIN: the root table, then one join per edge in plan order
//! - WHERE: root filter, edge filters, many-to-many filters, extra predicate,
//!   key predicate (always last)
//! - ORDER BY: root ordering, edge orderings (a many-to-many element edge is
//!   followed by its collection's ordering), caller ordering

use std::collections::HashMap;

use super::alias::{AliasTable, ColumnSuffix, NodeSuffixes};
use super::key_predicate::KeyPredicate;
use super::statement::{
    FilterItems, FromTable, Join, JoinCondition, JoinItems, OrderByItems, SelectItem, SelectItems,
    SelectStatement,
};
use super::ToSql;
use crate::join_walker::{JoinPlan, SelectShape};
use crate::persister_catalog::fragments::{parenthesize, render_template};
use crate::persister_catalog::MappingError;

/// Inputs of one statement beyond the plan itself.
#[derive(Debug, Clone, Copy)]
pub struct StatementParts<'a> {
    pub plan: &'a JoinPlan,
    pub aliases: &'a AliasTable,
    pub key_predicate: Option<&'a KeyPredicate>,
    /// Additional restriction, already rendered against the plan's aliases
    pub extra_predicate: Option<&'a str>,
    /// Caller ordering appended after the mapped orderings
    pub order_by: Option<&'a str>,
}

impl<'a> StatementParts<'a> {
    pub fn new(plan: &'a JoinPlan, aliases: &'a AliasTable) -> Self {
        StatementParts {
            plan,
            aliases,
            key_predicate: None,
            extra_predicate: None,
            order_by: None,
        }
    }

    pub fn with_key_predicate(mut self, predicate: &'a KeyPredicate) -> Self {
        self.key_predicate = Some(predicate);
        self
    }

    pub fn with_extra_predicate(mut self, predicate: &'a str) -> Self {
        self.extra_predicate = Some(predicate);
        self
    }

    pub fn with_order_by(mut self, order_by: &'a str) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

/// Many-to-many fragments resolved against their element edge.
#[derive(Default)]
struct ResolvedManyToMany {
    filters: Vec<String>,
    /// edge index -> ordering rendered against that edge's alias
    orders: HashMap<usize, String>,
}

pub struct StatementAssembler;

impl StatementAssembler {
    pub fn render(parts: &StatementParts<'_>) -> Result<SelectStatement, MappingError> {
        let plan = parts.plan;
        let many_to_many = Self::resolve_many_to_many(plan)?;

        let mut select = Vec::new();
        Self::select_node(
            &plan.root.alias,
            &plan.root.shape,
            parts.aliases.root_suffixes(),
            &mut select,
        );
        let no_suffixes = NodeSuffixes::default();
        for edge in &plan.edges {
            let suffixes = parts.aliases.suffixes_of(edge.index).unwrap_or(&no_suffixes);
            Self::select_node(&edge.target_alias, &edge.shape, suffixes, &mut select);
        }

        let joins = plan
            .edges
            .iter()
            .map(|edge| Join {
                table_name: edge.target_table.clone(),
                table_alias: edge.target_alias.clone(),
                join_type: edge.join_type,
                joining_on: edge
                    .join_columns
                    .iter()
                    .map(|c| JoinCondition {
                        lhs_alias: edge.source_alias.clone(),
                        lhs_column: c.lhs.clone(),
                        rhs_alias: edge.target_alias.clone(),
                        rhs_column: c.rhs.clone(),
                    })
                    .collect(),
            })
            .collect();

        let mut filters = Vec::new();
        filters.extend(plan.root.filter_fragment.iter().map(|f| parenthesize(f)));
        filters.extend(
            plan.edges
                .iter()
                .filter_map(|e| e.filter_fragment.as_deref())
                .map(parenthesize),
        );
        filters.extend(many_to_many.filters.iter().map(|f| parenthesize(f)));
        filters.extend(parts.extra_predicate.map(parenthesize));
        // Key predicate last so positional key parameters follow filter parameters
        filters.extend(parts.key_predicate.map(|p| p.to_sql()));

        let mut order_by = Vec::new();
        order_by.extend(plan.root.order_fragment.clone());
        for edge in &plan.edges {
            order_by.extend(edge.order_fragment.clone());
            order_by.extend(many_to_many.orders.get(&edge.index).cloned());
        }
        order_by.extend(
            parts
                .order_by
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
        );

        Ok(SelectStatement {
            select: SelectItems(select),
            from: FromTable {
                table_name: plan.root.table.clone(),
                alias: plan.root.alias.clone(),
            },
            joins: JoinItems(joins),
            filters: FilterItems(filters),
            order_by: OrderByItems(order_by),
        })
    }

    /// Render to SQL text in one step.
    pub fn render_sql(parts: &StatementParts<'_>) -> Result<String, MappingError> {
        Ok(Self::render(parts)?.to_sql())
    }

    fn resolve_many_to_many(plan: &JoinPlan) -> Result<ResolvedManyToMany, MappingError> {
        let mut resolved = ResolvedManyToMany::default();
        for fragments in &plan.many_to_many {
            let edge = plan
                .many_to_many_element_edge(&fragments.collection_alias, &fragments.element_entity)
                .ok_or_else(|| MappingError::MissingManyToManyElementJoin {
                    role: fragments.role.clone(),
                })?;

            if let Some(template) = &fragments.filter_template {
                resolved
                    .filters
                    .push(render_template(template, &edge.target_alias));
            }
            if let Some(template) = &fragments.order_template {
                resolved
                    .orders
                    .insert(edge.index, render_template(template, &edge.target_alias));
            }
        }
        Ok(resolved)
    }

    fn select_node(alias: &str, shape: &SelectShape, suffixes: &NodeSuffixes, out: &mut Vec<SelectItem>) {
        match shape {
            SelectShape::Entity { columns } => {
                select_columns(alias, columns, suffixes.entity.as_ref(), out)
            }
            SelectShape::Collection { columns } => {
                select_columns(alias, columns, suffixes.collection.as_ref(), out)
            }
            SelectShape::CollectionOfEntities {
                collection_columns,
                entity_columns,
            } => {
                select_columns(alias, collection_columns, suffixes.collection.as_ref(), out);
                select_columns(alias, entity_columns, suffixes.entity.as_ref(), out);
            }
        }
    }
}

fn select_columns(
    alias: &str,
    columns: &[String],
    suffix: Option<&ColumnSuffix>,
    out: &mut Vec<SelectItem>,
) {
    for column in columns {
        out.push(SelectItem {
            expression: format!("{}.{}", alias, column),
            col_alias: suffix.map_or_else(|| column.clone(), |s| s.column_alias(column)),
        });
    }
}
