//! Specified-configuration cache
//!
//! Maps the identity of an explicitly supplied configuration object to the
//! result of augmenting it. The cache belongs to one resolver session and is
//! never evicted by the resolver; the owner decides when to clear it.
//!
//! Each identity owns a slot guarded by an async mutex so the resolver can
//! run its check-augment-store sequence for a cacheable configuration without
//! another task augmenting the same object in between.

use crate::config::{ConfigId, ResolvedConfig, SpecifiedConfig};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Shared, lockable storage for one identity's resolved configuration
pub(crate) type CacheSlot = Arc<Mutex<Option<Arc<ResolvedConfig>>>>;

struct CacheEntry {
    // Holding the config keeps its allocation alive, so the address-based
    // ConfigId can't be reused by another object while the entry exists.
    _config: SpecifiedConfig,
    slot: CacheSlot,
}

/// Identity-keyed cache of augmented explicit configurations
#[derive(Default)]
pub struct SpecifiedConfigCache {
    entries: DashMap<ConfigId, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SpecifiedConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the slot for a configuration's identity
    pub(crate) fn slot(&self, config: &SpecifiedConfig) -> CacheSlot {
        self.entries
            .entry(config.id())
            .or_insert_with(|| CacheEntry {
                _config: config.clone(),
                slot: Arc::new(Mutex::new(None)),
            })
            .slot
            .clone()
    }

    /// Get the cached result for a configuration, if one has settled
    pub async fn get(&self, config: &SpecifiedConfig) -> Option<Arc<ResolvedConfig>> {
        let slot = self.entries.get(&config.id())?.slot.clone();
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Store a result under a configuration's identity, replacing any previous one
    pub async fn insert(&self, config: &SpecifiedConfig, resolved: Arc<ResolvedConfig>) {
        let slot = self.slot(config);
        *slot.lock().await = Some(resolved);
    }

    /// Forget the entry for a configuration
    pub fn remove(&self, config: &SpecifiedConfig) -> bool {
        self.entries.remove(&config.id()).is_some()
    }

    /// Remove all entries and reset statistics
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of identities tracked
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SpecifiedConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecifiedConfigCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolved(marker: &str) -> Arc<ResolvedConfig> {
        Arc::new(ResolvedConfig::new(
            json!({ "rules": { marker: true } }),
            "/project/argument-config",
        ))
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_arc() {
        let cache = SpecifiedConfigCache::new();
        let config = SpecifiedConfig::new(json!({}));
        let value = resolved("a");

        cache.insert(&config, value.clone()).await;

        let cached = cache.get(&config).await.unwrap();
        assert!(Arc::ptr_eq(&cached, &value));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn structurally_equal_configs_are_distinct_keys() {
        let cache = SpecifiedConfigCache::new();
        let first = SpecifiedConfig::new(json!({ "rules": {} }));
        let second = SpecifiedConfig::new(json!({ "rules": {} }));

        cache.insert(&first, resolved("a")).await;

        assert!(cache.get(&second).await.is_none());
        assert!(cache.get(&first.clone()).await.is_some());
    }

    #[tokio::test]
    async fn insert_overwrites_previous_value() {
        let cache = SpecifiedConfigCache::new();
        let config = SpecifiedConfig::new(json!({}));
        let newer = resolved("b");

        cache.insert(&config, resolved("a")).await;
        cache.insert(&config, newer.clone()).await;

        assert!(Arc::ptr_eq(&cache.get(&config).await.unwrap(), &newer));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let cache = SpecifiedConfigCache::new();
        let a = SpecifiedConfig::new(json!({}));
        let b = SpecifiedConfig::new(json!({}));
        cache.insert(&a, resolved("a")).await;
        cache.insert(&b, resolved("b")).await;
        cache.record_hit();

        assert!(cache.remove(&a));
        assert!(!cache.remove(&a));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn hit_rate() {
        let stats = CacheStats {
            size: 1,
            hits: 3,
            misses: 1,
        };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(
            CacheStats {
                size: 0,
                hits: 0,
                misses: 0
            }
            .hit_rate(),
            0.0
        );
    }
}
