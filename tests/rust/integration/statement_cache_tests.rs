//! Statement cache shared between loaders.

use std::sync::Arc;

use joinwalker::config::LoaderConfig;
use joinwalker::loader::{LoaderFacade, LruStatementCache, StatementCache};
use joinwalker::persister_catalog::EnabledFilters;

#[test]
fn test_loaders_share_cached_statements() {
    let cache: Arc<dyn StatementCache> = Arc::new(LruStatementCache::new(100));
    let catalog = Arc::new(crate::shop_catalog());
    let first = LoaderFacade::new(catalog.clone(), LoaderConfig::default(), cache.clone());
    let second = LoaderFacade::new(catalog, LoaderConfig::default(), cache.clone());

    let a = first.entity_loader("Customer", 1, &EnabledFilters::none()).unwrap();
    let b = second.entity_loader("Customer", 1, &EnabledFilters::none()).unwrap();

    assert!(Arc::ptr_eq(a.statement_for(1).unwrap(), b.statement_for(1).unwrap()));
    assert_eq!(cache.metrics().hits, 1);
}

#[test]
fn test_filters_are_part_of_the_cache_key() {
    let facade = LoaderFacade::with_config(Arc::new(crate::shop_catalog()), LoaderConfig::default());
    let tenant: EnabledFilters = ["tenant"].into_iter().collect();

    let plain = facade.entity_loader("Order", 1, &EnabledFilters::none()).unwrap();
    let filtered = facade.entity_loader("Order", 1, &tenant).unwrap();

    let plain_sql = &plain.statement_for(1).unwrap().sql;
    let filtered_sql = &filtered.statement_for(1).unwrap().sql;
    assert!(!plain_sql.contains("tenant_id"));
    assert!(filtered_sql.contains("order0_.tenant_id = :tenant.tenantId"));
    assert_eq!(facade.cache().metrics().size, 2);
}

#[test]
fn test_disabled_cache_still_compiles() {
    let config = LoaderConfig {
        cache_max_entries: 0,
        ..Default::default()
    };
    let facade = LoaderFacade::with_config(Arc::new(crate::shop_catalog()), config);

    let first = facade.entity_loader("Order", 1, &EnabledFilters::none()).unwrap();
    let second = facade.entity_loader("Order", 1, &EnabledFilters::none()).unwrap();

    assert_eq!(first.statement_for(1).unwrap().sql, second.statement_for(1).unwrap().sql);
    assert_eq!(facade.cache().metrics().size, 0);
    assert_eq!(facade.cache().metrics().hits, 0);
}
