//! Collection loaders: one-to-many, many-to-many and sub-select variants.

use std::sync::Arc;

use joinwalker::config::LoaderConfig;
use joinwalker::join_walker::{JoinType, RootKind};
use joinwalker::loader::LoaderFacade;
use joinwalker::persister_catalog::EnabledFilters;

fn facade() -> LoaderFacade {
    LoaderFacade::with_config(Arc::new(crate::shop_catalog()), LoaderConfig::default())
}

#[test]
fn test_one_to_many_never_joins_back_to_owner() {
    let loader = facade()
        .collection_loader("Customer.orders", 1, &EnabledFilters::none())
        .unwrap();
    let statement = loader.statement_for(1).unwrap();

    assert_eq!(statement.plan.root.kind, RootKind::OneToMany);
    assert!(statement
        .plan
        .edges
        .iter()
        .all(|e| e.target_name != "Customer"));
    assert!(!statement.sql.contains("customers"));
    assert!(statement.sql.contains("WHERE orders0_.customer_id = ?"));
}

#[test]
fn test_many_to_many_element_join_is_inner_and_owner_last() {
    let loader = facade()
        .collection_loader("Order.tags", 3, &EnabledFilters::none())
        .unwrap();
    let statement = loader.statement_for(3).unwrap();
    let edges = &statement.plan.edges;

    assert_eq!(statement.plan.root.kind, RootKind::ManyToMany);
    assert!(edges[0].is_many_to_many);
    assert_eq!(edges[0].join_type, JoinType::Inner);

    let owner = edges.last().unwrap();
    assert!(owner.synthetic_owner);
    assert_eq!(owner.join_type, JoinType::Inner);
    assert_eq!(owner.target_name, "Order");

    assert!(statement.sql.contains("WHERE tags0_.order_id in (?, ?, ?)"));
    assert!(statement.sql.ends_with("ORDER BY tag1_.label"));
}

#[test]
fn test_many_to_many_filter_targets_element_alias() {
    let filters: EnabledFilters = ["visible"].into_iter().collect();
    let loader = facade()
        .collection_loader("Order.tags", 1, &filters)
        .unwrap();
    let sql = &loader.statement_for(1).unwrap().sql;
    assert!(sql.contains("WHERE tag1_.hidden = :visible.hidden AND tags0_.order_id = ?"));
}

#[test]
fn test_collection_of_values_selects_collection_columns() {
    let loader = facade()
        .collection_loader("Order.notes", 1, &EnabledFilters::none())
        .unwrap();
    let statement = loader.statement_for(1).unwrap();

    assert_eq!(statement.plan.root.kind, RootKind::CollectionOfValues);
    assert!(statement.sql.contains("notes0_.note AS note_"));
    assert!(statement.sql.contains("FROM order_notes AS notes0_\n"));
}

#[test]
fn test_subselect_loader_binds_no_keys() {
    let statement = facade()
        .subselect_collection_loader(
            "Order.lines",
            "select o.id from orders o where o.customer_id = ?",
            &EnabledFilters::none(),
        )
        .unwrap();
    assert!(statement
        .sql
        .contains("WHERE lines0_.order_id in (select o.id from orders o where o.customer_id = ?)"));
}
