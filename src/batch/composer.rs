//! Batch descriptor and greedy largest-fit rung selection.

use super::errors::BatchConfigError;
use super::key_queue::PendingKeyQueue;
use super::ladder::{validate_sizes, BatchLadder};

/// One compiled statement per ladder rung, largest rung first.
#[derive(Debug, Clone)]
pub struct BatchDescriptor<S> {
    requested_size: usize,
    rungs: Vec<(usize, S)>,
}

/// The rung chosen for one load call and the keys bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSelection<'a, S, K> {
    pub size: usize,
    pub statement: &'a S,
    pub keys: Vec<K>,
}

impl<S> BatchDescriptor<S> {
    /// Validate the ladder for `requested`, then build one statement per rung.
    ///
    /// Nothing is built when the configuration is invalid.
    pub fn new<E, F>(requested: usize, ladder: &dyn BatchLadder, mut build: F) -> Result<Self, E>
    where
        E: From<BatchConfigError>,
        F: FnMut(usize) -> Result<S, E>,
    {
        if requested == 0 {
            return Err(BatchConfigError::NonPositiveBatchSize { requested }.into());
        }
        let sizes = ladder.sizes(requested);
        validate_sizes(ladder.name(), requested, &sizes)?;

        let mut rungs = Vec::with_capacity(sizes.len());
        for size in sizes {
            rungs.push((size, build(size)?));
        }
        log::debug!(
            "Batch descriptor for size {} ({} ladder): {} rung(s)",
            requested,
            ladder.name(),
            rungs.len()
        );

        Ok(BatchDescriptor {
            requested_size: requested,
            rungs,
        })
    }

    pub fn requested_size(&self) -> usize {
        self.requested_size
    }

    /// Realized sizes, descending.
    pub fn sizes(&self) -> Vec<usize> {
        self.rungs.iter().map(|(size, _)| *size).collect()
    }

    pub fn statement_for(&self, size: usize) -> Option<&S> {
        self.rungs.iter().find(|(s, _)| *s == size).map(|(_, st)| st)
    }

    pub fn rungs(&self) -> impl Iterator<Item = (usize, &S)> {
        self.rungs.iter().map(|(size, statement)| (*size, statement))
    }

    /// Choose the statement for loading `key`.
    ///
    /// Pulls up to `requested_size` keys from `queue` (requested key first) and
    /// picks the largest rung whose prefix of that list holds no padding. The
    /// size-1 rung always fits.
    pub fn initialize<K, Q>(&self, role: &str, key: &K, queue: &mut Q) -> BatchSelection<'_, S, K>
    where
        K: Clone,
        Q: PendingKeyQueue<K> + ?Sized,
    {
        let pending = queue.collect_batch(role, key, self.requested_size);
        let available = pending.iter().take_while(|k| k.is_some()).count();

        // The last rung has size 1, so it is the fallback when nothing fits
        let index = self
            .rungs
            .iter()
            .position(|(size, _)| *size <= available)
            .unwrap_or(self.rungs.len().saturating_sub(1));
        let (size, statement) = (self.rungs[index].0, &self.rungs[index].1);

        let keys: Vec<K> = if available >= size {
            pending.into_iter().take(size).flatten().collect()
        } else {
            vec![key.clone()]
        };
        log::debug!(
            "Batch load of `{}`: {} pending key(s), using size {}",
            role,
            available,
            size
        );

        BatchSelection {
            size,
            statement,
            keys,
        }
    }
}
