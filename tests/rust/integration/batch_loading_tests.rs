//! Batch loaders composed against a pending key queue.

use std::sync::Arc;

use test_case::test_case;

use joinwalker::batch::{BatchLadderKind, InMemoryKeyQueue};
use joinwalker::config::LoaderConfig;
use joinwalker::loader::{LoaderError, LoaderFacade};
use joinwalker::persister_catalog::EnabledFilters;

fn facade(ladder: BatchLadderKind) -> LoaderFacade {
    let config = LoaderConfig {
        batch_ladder: ladder,
        ..Default::default()
    };
    LoaderFacade::with_config(Arc::new(crate::shop_catalog()), config)
}

#[test]
fn test_three_pending_keys_use_size_two_statement() {
    let loader = facade(BatchLadderKind::Doubling)
        .entity_loader("Order", 4, &EnabledFilters::none())
        .unwrap();
    assert_eq!(loader.sizes(), vec![4, 2, 1]);

    let mut queue = InMemoryKeyQueue::new();
    for id in [101u64, 102, 103] {
        queue.add("Order", id);
    }

    let selection = loader.initialize(&102, &mut queue);
    assert_eq!(selection.size, 2);
    assert_eq!(selection.keys, vec![102, 101]);
    assert!(selection.statement.sql.contains("order0_.id in (?, ?)"));
    assert_eq!(selection.statement.batch_size, 2);
}

#[test]
fn test_lone_key_uses_single_key_statement() {
    let loader = facade(BatchLadderKind::Legacy)
        .entity_loader("Order", 25, &EnabledFilters::none())
        .unwrap();
    let mut queue: InMemoryKeyQueue<u64> = InMemoryKeyQueue::new();

    let selection = loader.initialize(&7, &mut queue);
    assert_eq!(selection.size, 1);
    assert_eq!(selection.keys, vec![7]);
    assert!(selection.statement.sql.contains("WHERE order0_.id = ?"));
}

#[test_case(BatchLadderKind::Legacy, 25, vec![25, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]; "legacy")]
#[test_case(BatchLadderKind::Doubling, 10, vec![10, 8, 4, 2, 1]; "doubling")]
#[test_case(BatchLadderKind::Linear, 12, vec![12, 7, 2, 1]; "linear")]
fn test_loader_sizes_follow_configured_ladder(ladder: BatchLadderKind, size: usize, expected: Vec<usize>) {
    let loader = facade(ladder)
        .entity_loader("Customer", size, &EnabledFilters::none())
        .unwrap();
    assert_eq!(loader.sizes(), expected);
    assert_eq!(loader.statements().count(), expected.len());
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let result = facade(BatchLadderKind::Legacy).collection_loader("Order.lines", 0, &EnabledFilters::none());
    assert!(matches!(result, Err(LoaderError::Configuration(_))));
}
