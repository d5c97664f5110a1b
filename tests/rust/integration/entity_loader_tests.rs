//! Entity loaders over small hand-built catalogs and the shop mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use joinwalker::config::LoaderConfig;
use joinwalker::join_walker::{JoinType, SelectShape};
use joinwalker::loader::{LoadRequest, LoaderFacade};
use joinwalker::persister_catalog::{
    AssociationMapping, Cardinality, CollectionElement, CollectionPersister, EnabledFilters,
    EntityPersister, FetchStyle, MappingCatalog,
};

fn entity(name: &str, table: &str, columns: &[&str]) -> EntityPersister {
    EntityPersister {
        name: name.to_string(),
        table: table.to_string(),
        key_columns: vec!["id".to_string()],
        columns: columns.iter().map(|c| c.to_string()).collect(),
        lazy: false,
        filters: BTreeMap::new(),
        associations: vec![],
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

/// A references B (required many-to-one) and owns the Cs (`A.cs`, one-to-many).
fn abc_catalog() -> MappingCatalog {
    let mut a = entity("A", "a_table", &["b_id"]);
    a.associations = vec![
        many_to_one("b", "B", "b_id", false),
        AssociationMapping {
            property: "cs".to_string(),
            cardinality: Cardinality::OneToMany,
            target: "A.cs".to_string(),
            columns: vec![],
            nullable: true,
            fetch: FetchStyle::Join,
        },
    ];
    MappingCatalog::new()
        .with_entity(a)
        .with_entity(entity("B", "b_table", &["name"]))
        .with_entity(entity("C", "c_table", &["a_id", "name"]))
        .with_collection(CollectionPersister {
            role: "A.cs".to_string(),
            owner: "A".to_string(),
            table: "c_table".to_string(),
            key_columns: vec!["a_id".to_string()],
            element: CollectionElement::OneToMany {
                entity: "C".to_string(),
            },
            order_by: None,
            many_to_many_order_by: None,
            filters: BTreeMap::new(),
            many_to_many_filters: BTreeMap::new(),
        })
}

#[test]
fn test_required_many_to_one_and_optional_one_to_many() {
    let facade = LoaderFacade::with_config(Arc::new(abc_catalog()), LoaderConfig::default());
    let loader = facade
        .entity_loader("A", 1, &EnabledFilters::none())
        .unwrap();
    let statement = loader.statement_for(1).unwrap();

    assert_eq!(
        statement.aliases.all_aliases().collect::<Vec<_>>(),
        vec!["a0_", "b1_", "cs2_"]
    );
    let edges = &statement.plan.edges;
    assert_eq!(edges.len(), 2);
    assert_eq!(
        edges.iter().map(|e| e.join_type).collect::<Vec<_>>(),
        vec![JoinType::Inner, JoinType::LeftOuter]
    );
    assert!(matches!(
        edges[1].shape,
        SelectShape::CollectionOfEntities { .. }
    ));

    assert!(statement.sql.starts_with("SELECT a0_.id AS id_0_"));
    assert!(statement.sql.ends_with(
        "FROM a_table AS a0_\n\
         INNER JOIN b_table AS b1_ ON a0_.b_id = b1_.id\n\
         LEFT OUTER JOIN c_table AS cs2_ ON a0_.id = cs2_.a_id\n\
         WHERE a0_.id = ?"
    ));
}

#[test]
fn test_compilation_is_deterministic() {
    let compile = || {
        let facade = LoaderFacade::with_config(Arc::new(crate::shop_catalog()), LoaderConfig::default());
        let filters: EnabledFilters = ["tenant", "active"].into_iter().collect();
        let loader = facade.entity_loader("Order", 12, &filters).unwrap();
        loader
            .statements()
            .map(|s| s.sql.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(compile(), compile());
}

#[test]
fn test_filters_precede_key_predicate() {
    let facade = LoaderFacade::with_config(Arc::new(crate::shop_catalog()), LoaderConfig::default());
    let filters: EnabledFilters = ["tenant", "active"].into_iter().collect();
    let loader = facade.entity_loader("Order", 2, &filters).unwrap();

    assert_eq!(loader.sizes(), vec![2, 1]);
    let sql = &loader.statement_for(2).unwrap().sql;
    assert!(sql.contains(
        "WHERE order0_.tenant_id = :tenant.tenantId AND lines3_.deleted = 0 AND order0_.id in (?, ?)\n"
    ));
}

#[test]
fn test_depth_limit_and_fetch_role() {
    let config = LoaderConfig {
        max_fetch_depth: Some(1),
        ..Default::default()
    };
    let facade = LoaderFacade::with_config(Arc::new(crate::shop_catalog()), config);

    let shallow = facade.plan(&LoadRequest::entity("Order")).unwrap();
    let aliases: Vec<&str> = shallow.edges.iter().map(|e| e.target_alias.as_str()).collect();
    assert_eq!(aliases, vec!["customer1_", "lines2_"]);

    let with_shipper = facade
        .plan(&LoadRequest::entity("Order").fetch_role("shipper"))
        .unwrap();
    assert!(with_shipper
        .edges
        .iter()
        .any(|e| e.property_path == "shipper" && e.join_type == JoinType::LeftOuter));
}

#[test]
fn test_unknown_entity_is_reported() {
    let facade = LoaderFacade::with_config(Arc::new(abc_catalog()), LoaderConfig::default());
    let err = facade
        .entity_loader("Missing", 1, &EnabledFilters::none())
        .unwrap_err();
    assert!(err.to_string().contains("Missing"));
}

#[test]
fn test_disjunctive_filter_stays_grouped_in_where() {
    let mut x = entity("X", "x_table", &["a", "b", "t"]);
    x.filters.insert(
        "region".to_string(),
        "{alias}.a = 1 or {alias}.b = 2".to_string(),
    );
    x.filters
        .insert("tenant".to_string(), "{alias}.t = :tid".to_string());
    let facade = LoaderFacade::with_config(
        Arc::new(MappingCatalog::new().with_entity(x)),
        LoaderConfig::default(),
    );
    let filters: EnabledFilters = ["region", "tenant"].into_iter().collect();
    let loader = facade.entity_loader("X", 1, &filters).unwrap();

    assert!(loader.statement_for(1).unwrap().sql.ends_with(
        "WHERE (x0_.a = 1 or x0_.b = 2) and x0_.t = :tenant.tid AND x0_.id = ?"
    ));
}
