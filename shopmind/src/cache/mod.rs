//! Shared key-value cache substrate.
//!
//! One [`Cache`] interface, two backends: a remote store speaking the redis
//! protocol and an in-process bounded map. Session memory, price quotes and
//! review summaries all sit on top of this, each under its own key prefix.
//!
//! The cache is best-effort by contract: no operation surfaces an error to
//! callers. A backend transport failure reads as a miss on `get` and is
//! silently dropped on `set`, so upstream code never needs error handling
//! around cache access.

mod handle;
mod in_memory;
mod redis_backend;

pub use handle::{reset_shared_handles, shared_handle, CacheNamespace};
pub use in_memory::InMemoryCache;
pub use redis_backend::RedisCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Transport-level cache errors. Internal to the backends; the [`Cache`]
/// trait itself never exposes them.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache transport error: {0}")]
    Transport(String),
}

/// Key-value store with per-entry TTL.
///
/// Reading an expired entry is indistinguishable from reading a missing one,
/// and the read evicts it. `set` replaces both the value and the expiry.
/// Values are opaque strings; callers serialize (typically JSON).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Value for `key`, or `None` when missing, expired, or unreachable.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`. `ttl: None` means no expiry. Failures are
    /// dropped; the cache is best-effort.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Removes `key`; returns whether it was present.
    async fn delete(&self, key: &str) -> bool;

    /// Removes every entry owned by this handle.
    async fn clear(&self);

    /// Number of live (unexpired) entries.
    async fn size(&self) -> usize;
}

pub(crate) fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: The trait is object-safe and usable through Arc<dyn Cache>.
    #[tokio::test]
    async fn cache_trait_object() {
        let cache: std::sync::Arc<dyn Cache> = std::sync::Arc::new(InMemoryCache::new());
        cache.set("key", "value", None).await;
        assert_eq!(cache.get("key").await.as_deref(), Some("value"));
        assert_eq!(cache.size().await, 1);
    }
}
