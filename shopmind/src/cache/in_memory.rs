//! In-process cache backend: bounded concurrent map with per-entry expiry.

use dashmap::DashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{now_epoch_secs, Cache};

/// No-expiry sentinel; also makes unexpiring entries the last eviction pick.
const NEVER: u64 = u64::MAX;

const DEFAULT_MAX_ENTRIES: usize = 4096;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: u64,
}

/// Bounded in-process [`Cache`].
///
/// Safe for concurrent readers and writers (dashmap shards). When full, the
/// entry with the earliest `expires_at` is evicted to make room. Expired
/// entries are removed on the next touch.
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    key_prefix: String,
    max_entries: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            key_prefix: String::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Prepends `prefix` to every user key.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Caps the number of stored entries. Minimum 1.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Drops the entry closest to expiry to make room for an insert.
    fn evict_earliest(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|e| e.value().expires_at)
            .map(|e| e.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let full = self.full_key(key);
        let expired = match self.entries.get(&full) {
            Some(entry) if entry.expires_at > now_epoch_secs() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&full);
        }
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let full = self.full_key(key);
        let expires_at = match ttl {
            Some(d) => now_epoch_secs().saturating_add(d.as_secs()),
            None => NEVER,
        };
        if !self.entries.contains_key(&full) && self.entries.len() >= self.max_entries {
            self.evict_earliest();
        }
        self.entries.insert(
            full,
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.remove(&self.full_key(key)).is_some()
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn size(&self) -> usize {
        let now = now_epoch_secs();
        self.entries.retain(|_, e| e.expires_at > now);
        self.entries.len()
    }
}
