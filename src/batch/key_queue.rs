use std::collections::{HashMap, VecDeque};

/// Session-scoped queue of keys whose rows are known to be needed soon.
///
/// Owned by a single logical session; batch composition borrows it mutably.
pub trait PendingKeyQueue<K> {
    /// Up to `max` keys for `role`: `requested` first, then other pending keys,
    /// padded with `None` to exactly `max` entries.
    fn collect_batch(&mut self, role: &str, requested: &K, max: usize) -> Vec<Option<K>>;
}

/// Insertion-ordered pending keys per role.
#[derive(Debug, Clone)]
pub struct InMemoryKeyQueue<K> {
    pending: HashMap<String, VecDeque<K>>,
}

impl<K> Default for InMemoryKeyQueue<K> {
    fn default() -> Self {
        InMemoryKeyQueue {
            pending: HashMap::new(),
        }
    }
}

impl<K: Clone + PartialEq> InMemoryKeyQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key` for `role`; already queued keys keep their position.
    pub fn add(&mut self, role: &str, key: K) {
        let keys = self.pending.entry(role.to_string()).or_default();
        if !keys.contains(&key) {
            keys.push_back(key);
        }
    }

    /// Forget `key` once its row has been loaded.
    pub fn remove(&mut self, role: &str, key: &K) {
        if let Some(keys) = self.pending.get_mut(role) {
            keys.retain(|k| k != key);
        }
    }

    pub fn len(&self, role: &str) -> usize {
        self.pending.get(role).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, role: &str) -> bool {
        self.len(role) == 0
    }
}

impl<K: Clone + PartialEq> PendingKeyQueue<K> for InMemoryKeyQueue<K> {
    fn collect_batch(&mut self, role: &str, requested: &K, max: usize) -> Vec<Option<K>> {
        let mut batch = Vec::with_capacity(max);
        if max == 0 {
            return batch;
        }
        batch.push(Some(requested.clone()));

        if let Some(keys) = self.pending.get(role) {
            batch.extend(
                keys.iter()
                    .filter(|k| *k != requested)
                    .take(max - 1)
                    .cloned()
                    .map(Some),
            );
        }
        batch.resize(max, None);
        batch
    }
}
