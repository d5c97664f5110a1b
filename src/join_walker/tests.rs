//! Planner tests against the shop mapping fixture.
//!
//! The fixture covers:
//! - non-nullable and nullable many-to-one chains (INNER vs LEFT OUTER)
//! - a bidirectional one-to-many (`Customer.orders` / `Order.customer`)
//! - a one-to-many collection whose element points back at the owner
//! - a many-to-many collection with target-side filter and ordering
//! - a collection of values
//!
//! A second mapping covers component and composite-element associations.

use super::*;
use crate::persister_catalog::{
    AssociationMapping, Cardinality, CollectionElement, EnabledFilters, EntityPersister,
    FetchStyle, MappingCatalog, MappingConfig, MappingError,
};
use std::collections::BTreeMap;

const SHOP_MAPPING: &str = include_str!("../../tests/fixtures/shop_mapping.yaml");

fn shop_catalog() -> MappingCatalog {
    MappingConfig::from_yaml_str(SHOP_MAPPING)
        .and_then(MappingConfig::into_catalog)
        .expect("shop fixture is valid")
}

fn one_collection() -> FetchLimits {
    FetchLimits {
        max_fetch_depth: None,
        max_collection_fetches: Some(1),
    }
}

fn plan(catalog: &MappingCatalog, root: LoadRoot, limits: FetchLimits) -> JoinPlan {
    JoinPlanner::for_root(catalog, &root, limits)
        .and_then(|planner| planner.plan(&root, &EnabledFilters::none()))
        .expect("plan succeeds")
}

fn aliases(plan: &JoinPlan) -> Vec<&str> {
    plan.edges.iter().map(|e| e.target_alias.as_str()).collect()
}

fn entity(name: &str, table: &str, associations: Vec<AssociationMapping>) -> EntityPersister {
    EntityPersister {
        name: name.to_string(),
        table: table.to_string(),
        key_columns: vec!["id".to_string()],
        columns: vec![],
        lazy: false,
        filters: BTreeMap::new(),
        associations,
        components: vec![],
    }
}

fn many_to_one(property: &str, target: &str, column: &str, nullable: bool) -> AssociationMapping {
    AssociationMapping {
        property: property.to_string(),
        cardinality: Cardinality::ManyToOne,
        target: target.to_string(),
        columns: vec![column.to_string()],
        nullable,
        fetch: FetchStyle::Default,
    }
}

#[test]
fn test_entity_walk_edge_order_and_join_types() {
    let catalog = shop_catalog();
    let plan = plan(&catalog, LoadRoot::entity("Order"), one_collection());

    assert_eq!(plan.root.alias, "order0_");
    assert_eq!(
        aliases(&plan),
        vec!["customer1_", "address2_", "lines3_", "product4_"]
    );

    let types: Vec<JoinType> = plan.edges.iter().map(|e| e.join_type).collect();
    assert_eq!(
        types,
        vec![
            JoinType::Inner,
            JoinType::Inner,
            JoinType::LeftOuter,
            // non-nullable, but reached through an outer join
            JoinType::LeftOuter,
        ]
    );

    assert_eq!(plan.edges[1].property_path, "customer.address");
    assert_eq!(plan.edges[1].source_alias, "customer1_");
    assert_eq!(plan.edges[3].property_path, "lines.product");
    assert_eq!(plan.owner_of(3), Some(2));
    assert_eq!(plan.owner_of(0), None);
}

#[test]
fn test_bidirectional_association_joined_once() {
    let catalog = shop_catalog();
    let plan = plan(&catalog, LoadRoot::entity("Order"), one_collection());

    // Customer.orders shares the orders(customer_id) foreign key with Order.customer
    assert!(plan.edges.iter().all(|e| e.target_name != "Customer.orders"));
    // OrderLine.order shares order_lines(order_id) with Order.lines
    assert!(plan.edges.iter().all(|e| e.property_path != "lines.order"));

    let mut keys: Vec<&AssociationKey> = plan.edges.iter().map(|e| &e.key).collect();
    let total = keys.len();
    keys.sort_by_key(|k| k.to_string());
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[test]
fn test_collection_limit_and_unbounded_walk() {
    let catalog = shop_catalog();

    let limited = plan(&catalog, LoadRoot::entity("Order"), one_collection());
    assert!(limited.edges.iter().all(|e| e.target_name != "Order.notes"));

    let unbounded = plan(&catalog, LoadRoot::entity("Order"), FetchLimits::unbounded());
    let notes = unbounded
        .edges
        .iter()
        .find(|e| e.target_name == "Order.notes")
        .expect("notes joined without a collection limit");
    assert_eq!(notes.target_alias, "notes5_");
    assert_eq!(notes.join_type, JoinType::LeftOuter);
    assert!(matches!(notes.shape, SelectShape::Collection { .. }));
}

#[test]
fn test_max_fetch_depth_stops_nested_joins() {
    let catalog = shop_catalog();
    let limits = FetchLimits {
        max_fetch_depth: Some(1),
        max_collection_fetches: Some(1),
    };
    let plan = plan(&catalog, LoadRoot::entity("Order"), limits);
    assert_eq!(aliases(&plan), vec!["customer1_", "lines2_"]);
    assert!(plan.edges.iter().all(|e| e.depth == 0));
}

#[test]
fn test_lazy_and_select_associations_are_skipped_unless_fetch_role() {
    let catalog = shop_catalog();
    let root = LoadRoot::entity("Order");
    let planner = JoinPlanner::for_root(&catalog, &root, one_collection()).unwrap();

    let default_plan = planner.plan(&root, &EnabledFilters::none()).unwrap();
    assert!(default_plan.edges.iter().all(|e| e.property_path != "shipper"));
    assert!(default_plan.edges.iter().all(|e| e.property_path != "tags"));

    let with_role = planner
        .plan_with_fetch_role(&root, &EnabledFilters::none(), Some("shipper"))
        .unwrap();
    let shipper = with_role
        .edges
        .iter()
        .find(|e| e.property_path == "shipper")
        .expect("fetch role forces the join");
    assert_eq!(shipper.join_type, JoinType::LeftOuter);
}

#[test]
fn test_lazy_target_entity_not_joined_by_default() {
    let mut address = entity("Address", "addresses", vec![]);
    address.lazy = true;
    let catalog = MappingCatalog::new()
        .with_entity(entity(
            "Person",
            "people",
            vec![many_to_one("home", "Address", "home_id", true)],
        ))
        .with_entity(address);

    let plan = plan(&catalog, LoadRoot::entity("Person"), FetchLimits::unbounded());
    assert!(plan.is_empty());
}

#[test]
fn test_self_reference_terminates() {
    let catalog = MappingCatalog::new().with_entity(entity(
        "Employee",
        "employees",
        vec![
            many_to_one("manager", "Employee", "manager_id", true),
            many_to_one("mentor", "Employee", "mentor_id", true),
        ],
    ));

    let plan = plan(&catalog, LoadRoot::entity("Employee"), FetchLimits::unbounded());
    assert_eq!(aliases(&plan), vec!["employee1_", "employee2_"]);
    assert_eq!(plan.edges[0].property_path, "manager");
    assert_eq!(plan.edges[1].property_path, "mentor");
}

#[test]
fn test_mutual_references_terminate() {
    let catalog = MappingCatalog::new()
        .with_entity(entity("A", "a", vec![many_to_one("b", "B", "b_id", true)]))
        .with_entity(entity("B", "b", vec![many_to_one("a", "A", "a_id", true)]));

    // B.a uses a different foreign key, so it is joined; the walk then stops
    // because A is already on the path
    let plan = plan(&catalog, LoadRoot::entity("A"), FetchLimits::unbounded());
    assert_eq!(aliases(&plan), vec!["b1_", "a2_"]);
    assert_eq!(plan.edges[1].property_path, "b.a");
}

#[test]
fn test_one_to_many_root_never_joins_back_to_owner() {
    let catalog = shop_catalog();
    let plan = plan(&catalog, LoadRoot::collection("Order.lines"), one_collection());

    assert_eq!(plan.root.kind, RootKind::OneToMany);
    assert_eq!(plan.root.alias, "lines0_");
    assert_eq!(plan.root.table, "order_lines");
    assert_eq!(plan.root.key_columns, vec!["order_id"]);
    assert_eq!(plan.root.order_fragment.as_deref(), Some("lines0_.line_no asc"));

    assert_eq!(aliases(&plan), vec!["product1_"]);
    assert_eq!(plan.edges[0].join_type, JoinType::Inner);
    assert!(plan.edges.iter().all(|e| e.target_name != "Order"));
}

#[test]
fn test_many_to_many_root() {
    let catalog = shop_catalog();
    let plan = plan(&catalog, LoadRoot::collection("Order.tags"), one_collection());

    assert_eq!(plan.root.kind, RootKind::ManyToMany);
    assert_eq!(aliases(&plan), vec!["tag1_", "order2_"]);

    let element = &plan.edges[0];
    assert!(element.is_many_to_many);
    assert_eq!(element.join_type, JoinType::Inner);
    assert_eq!(element.depth, 0);
    assert_eq!(element.many_to_many_role.as_deref(), Some("Order.tags"));
    assert_eq!(
        element.join_columns,
        vec![JoinColumn {
            lhs: "tag_id".to_string(),
            rhs: "id".to_string()
        }]
    );

    let owner = &plan.edges[1];
    assert!(owner.synthetic_owner);
    assert_eq!(owner.join_type, JoinType::Inner);
    assert_eq!(owner.source_alias, "tags0_");

    // Ordering is mapped, the filter is not enabled
    assert_eq!(plan.many_to_many.len(), 1);
    assert_eq!(plan.many_to_many[0].filter_template, None);
    assert_eq!(
        plan.many_to_many[0].order_template.as_deref(),
        Some("{alias}.label")
    );
    assert!(plan
        .many_to_many_element_edge("tags0_", "Tag")
        .is_some_and(|e| e.target_alias == "tag1_"));
}

#[test]
fn test_many_to_many_filter_keeps_placeholder_until_assembly() {
    let catalog = shop_catalog();
    let root = LoadRoot::collection("Order.tags");
    let filters: EnabledFilters = ["visible"].into_iter().collect();
    let plan = JoinPlanner::for_root(&catalog, &root, one_collection())
        .and_then(|p| p.plan(&root, &filters))
        .unwrap();

    assert_eq!(
        plan.many_to_many[0].filter_template.as_deref(),
        Some("{alias}.hidden = :visible.hidden")
    );
}

#[test]
fn test_collection_of_values_root_has_only_owner_edge() {
    let catalog = shop_catalog();
    let plan = plan(&catalog, LoadRoot::collection("Order.notes"), one_collection());

    assert_eq!(plan.root.kind, RootKind::CollectionOfValues);
    assert_eq!(aliases(&plan), vec!["order1_"]);
    assert!(plan.edges[0].synthetic_owner);
    assert_eq!(plan.edges[0].join_type, JoinType::Inner);
    assert!(plan.many_to_many.is_empty());
}

#[test]
fn test_filters_rendered_against_edge_alias() {
    let catalog = shop_catalog();
    let root = LoadRoot::entity("Order");
    let filters: EnabledFilters = ["tenant", "active"].into_iter().collect();
    let plan = JoinPlanner::for_root(&catalog, &root, one_collection())
        .and_then(|p| p.plan(&root, &filters))
        .unwrap();

    assert_eq!(
        plan.root.filter_fragment.as_deref(),
        Some("order0_.tenant_id = :tenant.tenantId")
    );
    let lines = plan.edge_by_alias("lines3_").unwrap();
    assert_eq!(lines.filter_fragment.as_deref(), Some("lines3_.deleted = 0"));
    assert_eq!(lines.order_fragment.as_deref(), Some("lines3_.line_no asc"));
}

#[test]
fn test_planning_is_deterministic() {
    let catalog = shop_catalog();
    let first = plan(&catalog, LoadRoot::entity("Customer"), FetchLimits::unbounded());
    let second = plan(&catalog, LoadRoot::entity("Customer"), FetchLimits::unbounded());
    assert_eq!(first, second);
}

#[test]
fn test_unknown_root_and_bad_cardinality() {
    let catalog = shop_catalog();
    let root = LoadRoot::entity("Invoice");
    let planner = JoinPlanner::new(&catalog, WalkStrategy::entity(FetchLimits::unbounded()));
    assert!(matches!(
        planner.plan(&root, &EnabledFilters::none()),
        Err(MappingError::UnknownEntity { .. })
    ));

    let bad = MappingCatalog::new()
        .with_entity(entity(
            "Person",
            "people",
            vec![AssociationMapping {
                property: "friends".to_string(),
                cardinality: Cardinality::OneToMany,
                target: "Person".to_string(),
                columns: vec![],
                nullable: true,
                fetch: FetchStyle::Join,
            }],
        ));
    let root = LoadRoot::entity("Person");
    let planner = JoinPlanner::new(&bad, WalkStrategy::entity(FetchLimits::unbounded()));
    assert!(matches!(
        planner.plan(&root, &EnabledFilters::none()),
        Err(MappingError::UnsupportedCardinality { .. })
    ));
}

#[test]
fn test_column_count_mismatch_is_reported() {
    let mut composite = entity("Region", "regions", vec![]);
    composite.key_columns = vec!["country".to_string(), "code".to_string()];
    let catalog = MappingCatalog::new()
        .with_entity(entity(
            "Store",
            "stores",
            vec![many_to_one("region", "Region", "region_code", true)],
        ))
        .with_entity(composite);

    let root = LoadRoot::entity("Store");
    let planner = JoinPlanner::new(&catalog, WalkStrategy::entity(FetchLimits::unbounded()));
    assert!(matches!(
        planner.plan(&root, &EnabledFilters::none()),
        Err(MappingError::ColumnCountMismatch { lhs: 1, rhs: 2, .. })
    ));
}

const SHIPPING_MAPPING: &str = r#"
entities:
  - name: Shipment
    table: shipments
    key_columns: [id]
    columns: [weight]
    associations:
      - property: items
        cardinality: element_collection
        target: Shipment.items
        fetch: join
    components:
      - property: shipping
        columns: [shipping_street, shipping_country_id]
        associations:
          - property: country
            cardinality: many_to_one
            target: Country
            columns: [shipping_country_id]
            nullable: false
        components:
          - property: carrier
            columns: [depot_id]
            associations:
              - property: depot
                cardinality: many_to_one
                target: Depot
                columns: [depot_id]
  - name: Country
    table: countries
    key_columns: [id]
    columns: [region_id]
    associations:
      - property: region
        cardinality: many_to_one
        target: Region
        columns: [region_id]
        nullable: false
  - name: Region
    table: regions
    key_columns: [id]
  - name: Depot
    table: depots
    key_columns: [id]
  - name: Product
    table: products
    key_columns: [id]
collections:
  - role: Shipment.items
    owner: Shipment
    table: shipment_items
    key_columns: [shipment_id]
    element:
      kind: values
      columns: [quantity]
      associations:
        - property: product
          cardinality: many_to_one
          target: Product
          columns: [product_id]
"#;

fn shipping_catalog() -> MappingCatalog {
    MappingConfig::from_yaml_str(SHIPPING_MAPPING)
        .and_then(MappingConfig::into_catalog)
        .expect("shipping mapping is valid")
}

#[test]
fn test_component_and_composite_element_associations_are_walked() {
    let catalog = shipping_catalog();
    let plan = plan(&catalog, LoadRoot::entity("Shipment"), FetchLimits::unbounded());

    assert_eq!(
        aliases(&plan),
        vec!["items1_", "product2_", "country3_", "region4_", "depot5_"]
    );
    let paths: Vec<&str> = plan.edges.iter().map(|e| e.property_path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "items",
            "items.product",
            "shipping.country",
            "shipping.country.region",
            "shipping.carrier.depot"
        ]
    );
    let sources: Vec<&str> = plan.edges.iter().map(|e| e.source_alias.as_str()).collect();
    assert_eq!(
        sources,
        vec!["shipment0_", "items1_", "shipment0_", "country3_", "shipment0_"]
    );
    let types: Vec<JoinType> = plan.edges.iter().map(|e| e.join_type).collect();
    assert_eq!(
        types,
        vec![
            JoinType::LeftOuter,
            JoinType::LeftOuter,
            JoinType::Inner,
            JoinType::Inner,
            JoinType::LeftOuter
        ]
    );

    // Foreign keys of component references live in the owner's table
    assert_eq!(plan.edges[2].key.table, "shipments");
    assert_eq!(plan.edges[2].key.columns, vec!["shipping_country_id"]);
    assert_eq!(plan.edges[1].key.table, "shipment_items");

    assert_eq!(
        plan.root.shape,
        SelectShape::Entity {
            columns: vec![
                "id".to_string(),
                "weight".to_string(),
                "shipping_street".to_string(),
                "shipping_country_id".to_string(),
                "depot_id".to_string()
            ]
        }
    );
}

#[test]
fn test_composite_element_root_joins_references_before_owner() {
    let catalog = shipping_catalog();
    let plan = plan(&catalog, LoadRoot::collection("Shipment.items"), one_collection());

    assert_eq!(plan.root.kind, RootKind::CollectionOfValues);
    assert_eq!(
        plan.root.shape,
        SelectShape::Collection {
            columns: vec![
                "shipment_id".to_string(),
                "quantity".to_string(),
                "product_id".to_string()
            ]
        }
    );
    assert_eq!(aliases(&plan), vec!["product1_", "shipment2_"]);

    let product = &plan.edges[0];
    assert_eq!(product.property_path, "product");
    assert_eq!(product.source_alias, "items0_");
    assert_eq!(product.join_type, JoinType::LeftOuter);
    assert!(!product.is_many_to_many);
    assert!(plan.edges[1].synthetic_owner);
}

#[test]
fn test_collection_inside_composite_element_is_rejected() {
    let mut config = MappingConfig::from_yaml_str(SHIPPING_MAPPING).unwrap();
    if let CollectionElement::Values { associations, .. } = &mut config.collections[0].element {
        associations[0].cardinality = Cardinality::OneToMany;
        associations[0].target = "Shipment.items".to_string();
    }
    let mut catalog = MappingCatalog::new();
    config.entities.into_iter().for_each(|e| catalog.insert_entity(e));
    config.collections.into_iter().for_each(|c| catalog.insert_collection(c));

    let root = LoadRoot::collection("Shipment.items");
    let planner = JoinPlanner::for_root(&catalog, &root, FetchLimits::unbounded()).unwrap();
    match planner.plan(&root, &EnabledFilters::none()) {
        Err(MappingError::UnsupportedCardinality { property, .. }) => {
            assert_eq!(property, "Shipment.items.product")
        }
        other => panic!("expected UnsupportedCardinality, got {:?}", other),
    }
}
