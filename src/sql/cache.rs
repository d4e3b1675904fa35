//! Bounded memoization for structural extraction and normalization
//!
//! Both operations are pure functions of the SQL text, so caching is
//! transparent: cached and uncached passes produce identical output. The
//! cache is an explicit object owned by the engine and shared by
//! reference; there is no global state, and capacity is bounded with an
//! oldest-first eviction so long-lived processes cannot grow without
//! limit.

use super::normalize;
use super::structure::{self, StructuralQuery};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Share of entries dropped when a map exceeds capacity
const EVICTION_RATIO: f64 = 0.2;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    seq: u64,
}

/// Thread-safe cache keyed by SQL text
#[derive(Debug)]
pub struct SqlCache {
    structures: DashMap<String, Entry<Arc<StructuralQuery>>>,
    signatures: DashMap<String, Entry<Arc<str>>>,
    capacity: usize,
    counter: AtomicU64,
}

impl SqlCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            structures: DashMap::new(),
            signatures: DashMap::new(),
            capacity: capacity.max(1),
            counter: AtomicU64::new(0),
        }
    }

    /// Structural view of `sql`, computed once per distinct text
    pub fn structure(&self, sql: &str) -> Arc<StructuralQuery> {
        if let Some(entry) = self.structures.get(sql) {
            return entry.value.clone();
        }
        let computed = Arc::new(structure::extract(sql));
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.structures.insert(
            sql.to_string(),
            Entry {
                value: computed.clone(),
                seq,
            },
        );
        evict_oldest(&self.structures, self.capacity);
        computed
    }

    /// Normalized signature of `sql`, computed once per distinct text
    pub fn signature(&self, sql: &str) -> Arc<str> {
        if let Some(entry) = self.signatures.get(sql) {
            return entry.value.clone();
        }
        let computed: Arc<str> = Arc::from(normalize::normalize(sql).as_str());
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.signatures.insert(
            sql.to_string(),
            Entry {
                value: computed.clone(),
                seq,
            },
        );
        evict_oldest(&self.signatures, self.capacity);
        computed
    }

    pub fn structures_len(&self) -> usize {
        self.structures.len()
    }

    pub fn signatures_len(&self) -> usize {
        self.signatures.len()
    }

    pub fn clear(&self) {
        self.structures.clear();
        self.signatures.clear();
    }
}

/// Drop the oldest ~20% of entries once `map` exceeds `capacity`
fn evict_oldest<V>(map: &DashMap<String, Entry<V>>, capacity: usize) {
    if map.len() <= capacity {
        return;
    }

    let mut by_age: Vec<(String, u64)> = map
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().seq))
        .collect();
    by_age.sort_by_key(|(_, seq)| *seq);

    let to_remove = ((by_age.len() as f64 * EVICTION_RATIO).ceil() as usize).max(1);
    for (key, _) in by_age.into_iter().take(to_remove) {
        map.remove(&key);
    }
    tracing::debug!(removed = to_remove, "evicted oldest cache entries");
}
