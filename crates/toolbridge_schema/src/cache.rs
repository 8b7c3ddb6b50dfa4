//! Conversion cache keyed by provider and catalog hash.

use derive_getters::Getters;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use toolbridge_core::{CacheConfig, ProviderTool};

/// A cached conversion of a whole catalog for one provider.
#[derive(Debug, Clone, Getters)]
pub struct ConversionCacheEntry {
    /// Provider key
    provider: String,
    /// Hash of the catalog this batch was converted from
    catalog_hash: String,
    /// The successfully converted tools
    tools: Arc<Vec<ProviderTool>>,
    /// Tools that failed conversion, with reasons
    failures: Arc<Vec<ConversionFailure>>,
    /// When the entry was stored
    created_at: Instant,
}

impl ConversionCacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// A tool that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct ConversionFailure {
    /// Canonical tool name
    tool: String,
    /// Why conversion or validation failed
    reason: String,
}

impl ConversionFailure {
    /// Creates a failure record.
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Getters)]
pub struct CacheStats {
    hits: u64,
    misses: u64,
    entries: usize,
}

type CacheKey = (String, String);

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, ConversionCacheEntry>,
    insertion_order: VecDeque<CacheKey>,
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) -> Option<ConversionCacheEntry> {
        self.insertion_order.retain(|k| k != key);
        self.entries.remove(key)
    }
}

/// Thread-safe conversion cache with TTL and least-recently-inserted eviction.
#[derive(Debug)]
pub struct ConversionCache {
    state: RwLock<CacheState>,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ConversionCache {
    /// Creates a cache holding at most `max_entries` batches for `ttl`.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries: max_entries.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a cache sized by configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Returns the live entry for `(provider, catalog_hash)`.
    pub fn get(&self, provider: &str, catalog_hash: &str) -> Option<ConversionCacheEntry> {
        let key = (provider.to_string(), catalog_hash.to_string());
        let found = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.entries.get(&key).cloned()
        };

        match found {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(_) => {
                tracing::debug!(provider, catalog_hash, "Conversion cache entry expired");
                self.write().remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a converted batch, evicting the oldest insertions beyond capacity.
    pub fn insert(
        &self,
        provider: &str,
        catalog_hash: &str,
        tools: Arc<Vec<ProviderTool>>,
        failures: Arc<Vec<ConversionFailure>>,
    ) -> ConversionCacheEntry {
        let key = (provider.to_string(), catalog_hash.to_string());
        let entry = ConversionCacheEntry {
            provider: provider.to_string(),
            catalog_hash: catalog_hash.to_string(),
            tools,
            failures,
            created_at: Instant::now(),
        };

        let mut state = self.write();
        state.remove(&key);
        state.entries.insert(key.clone(), entry.clone());
        state.insertion_order.push_back(key);

        while state.entries.len() > self.max_entries {
            let Some(oldest) = state.insertion_order.pop_front() else {
                break;
            };
            tracing::debug!(provider = %oldest.0, catalog_hash = %oldest.1, "Evicting conversion cache entry");
            state.entries.remove(&oldest);
        }
        entry
    }

    /// Drops every entry for `provider`. Returns how many were removed.
    pub fn invalidate_provider(&self, provider: &str) -> usize {
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|(p, _), _| p != provider);
        state.insertion_order.retain(|(p, _)| p != provider);
        before - state.entries.len()
    }

    /// Drops expired entries. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.write();
        let expired: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.insertion_order.clear();
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
