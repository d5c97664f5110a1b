//! Statement cache for compiled loaders
//!
//! Compiling a loader walks the association graph and renders SQL; the result
//! depends only on the cache key below, so it is compiled once and shared.
//!
//! # Architecture
//!
//! Cache Key: (persister, fetch role, batch size, sub-select text, enabled filters)
//! Cache Value: `Arc<GeneratedStatement>`
//!
//! # Contract
//!
//! `get_or_compute` is compute-if-absent with idempotent construction: the
//! builder runs outside the lock, two callers may compile the same key at the
//! same time, and the first stored statement is returned to both.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::errors::LoaderError;
use super::facade::GeneratedStatement;
use crate::persister_catalog::EnabledFilters;

/// Key for cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatementCacheKey {
    /// Entity name or collection role
    pub persister: String,
    /// Lazy association forced into the fetch
    pub fetch_role: Option<String>,
    pub batch_size: usize,
    pub subselect: Option<String>,
    pub filters: EnabledFilters,
}

impl StatementCacheKey {
    pub fn new(persister: &str, batch_size: usize, filters: &EnabledFilters) -> Self {
        StatementCacheKey {
            persister: persister.to_string(),
            fetch_role: None,
            batch_size,
            subselect: None,
            filters: filters.clone(),
        }
    }

    pub fn with_fetch_role(mut self, fetch_role: Option<&str>) -> Self {
        self.fetch_role = fetch_role.map(str::to_string);
        self
    }

    pub fn with_subselect(mut self, subselect: &str) -> Self {
        self.subselect = Some(subselect.to_string());
        self
    }
}

pub type StatementBuilder<'a> = dyn FnMut() -> Result<GeneratedStatement, LoaderError> + 'a;

pub trait StatementCache: Send + Sync + fmt::Debug {
    fn get_or_compute(
        &self,
        key: StatementCacheKey,
        build: &mut StatementBuilder<'_>,
    ) -> Result<Arc<GeneratedStatement>, LoaderError>;

    fn metrics(&self) -> CacheMetrics;

    fn clear(&self);
}

/// Cached entry with metadata
#[derive(Debug, Clone)]
struct CacheEntry {
    statement: Arc<GeneratedStatement>,
    /// Logical access time (for LRU)
    last_accessed: u64,
}

/// Statement cache with LRU eviction
#[derive(Debug)]
pub struct LruStatementCache {
    entries: Mutex<HashMap<StatementCacheKey, CacheEntry>>,
    /// Maximum number of entries; 0 disables storage
    max_entries: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LruStatementCache {
    pub fn new(max_entries: usize) -> Self {
        LruStatementCache {
            entries: Mutex::new(HashMap::new()),
            max_entries,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StatementCacheKey, CacheEntry>> {
        // Entries are only ever inserted whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn lookup(&self, key: &StatementCacheKey) -> Option<Arc<GeneratedStatement>> {
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        entry.last_accessed = self.tick();
        Some(entry.statement.clone())
    }

    /// Evict least recently used entry
    fn evict_lru(&self, entries: &mut HashMap<StatementCacheKey, CacheEntry>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
        {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Statement cache full ({} entries), evicted `{}` batch size {}",
                self.max_entries,
                key.persister,
                key.batch_size
            );
        }
    }
}

impl StatementCache for LruStatementCache {
    fn get_or_compute(
        &self,
        key: StatementCacheKey,
        build: &mut StatementBuilder<'_>,
    ) -> Result<Arc<GeneratedStatement>, LoaderError> {
        if let Some(statement) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(statement);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let statement = Arc::new(build()?);
        if self.max_entries == 0 {
            return Ok(statement);
        }

        let mut entries = self.lock();
        // Another caller may have stored this key while we were building
        if let Some(existing) = entries.get_mut(&key) {
            existing.last_accessed = self.tick();
            return Ok(existing.statement.clone());
        }
        if entries.len() >= self.max_entries {
            self.evict_lru(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                statement: statement.clone(),
                last_accessed: self.tick(),
            },
        );
        Ok(statement)
    }

    fn metrics(&self) -> CacheMetrics {
        let size = self.lock().len();
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            max_entries: self.max_entries,
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
