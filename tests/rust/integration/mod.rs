//! Integration tests - compile loaders through the public API
//!
//! These tests verify that catalog, planner, renderer, batching and the statement
//! cache work together the way a session uses them.

mod batch_loading_tests;
mod collection_loader_tests;
mod entity_loader_tests;
mod statement_cache_tests;

use joinwalker::persister_catalog::{load_catalog, MappingCatalog};

/// The shop mapping shared with the unit tests.
pub fn shop_catalog() -> MappingCatalog {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/shop_mapping.yaml");
    load_catalog(path).expect("shop mapping loads")
}
