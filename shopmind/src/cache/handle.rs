//! Process-wide cache handles, one per logical namespace.
//!
//! Each namespace picks its backend exactly once: try the remote server and
//! probe it with PING; on any failure fall back to the in-process map. The
//! choice sticks for the life of the process. Tests call
//! [`reset_shared_handles`] to force re-selection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Cache, InMemoryCache, RedisCache};

/// Logical cache namespaces sharing one physical store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Conversation histories (`session:`), TTL 1800 s.
    Session,
    /// Competitor price quotes (`price:`), TTL 3600 s.
    Price,
    /// Review digests (`review_summary:`), TTL 3600 s.
    ReviewSummary,
}

impl CacheNamespace {
    /// Prefix prepended to every key in this namespace.
    pub fn prefix(self) -> &'static str {
        match self {
            CacheNamespace::Session => "session:",
            CacheNamespace::Price => "price:",
            CacheNamespace::ReviewSummary => "review_summary:",
        }
    }

    /// Default entry lifetime for this namespace.
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheNamespace::Session => Duration::from_secs(1800),
            CacheNamespace::Price | CacheNamespace::ReviewSummary => Duration::from_secs(3600),
        }
    }
}

static HANDLES: Lazy<Mutex<HashMap<CacheNamespace, Arc<dyn Cache>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The process-wide handle for `namespace`, constructing it on first use.
///
/// `redis_url: Some(..)` attempts the remote backend first; `None` or a
/// failed PING selects the in-process backend. Construction is serialized so
/// concurrent first uses agree on one handle.
pub async fn shared_handle(
    namespace: CacheNamespace,
    redis_url: Option<&str>,
) -> Arc<dyn Cache> {
    let mut handles = HANDLES.lock().await;
    if let Some(existing) = handles.get(&namespace) {
        return Arc::clone(existing);
    }

    let handle: Arc<dyn Cache> = match redis_url {
        Some(url) => match RedisCache::connect_and_ping(url, namespace.prefix()).await {
            Ok(remote) => {
                info!(namespace = namespace.prefix(), "cache backend: redis");
                Arc::new(remote)
            }
            Err(e) => {
                debug!(
                    namespace = namespace.prefix(),
                    error = %e,
                    "redis unavailable; cache backend: in-memory"
                );
                Arc::new(InMemoryCache::new().with_key_prefix(namespace.prefix()))
            }
        },
        None => {
            debug!(namespace = namespace.prefix(), "cache backend: in-memory");
            Arc::new(InMemoryCache::new().with_key_prefix(namespace.prefix()))
        }
    };

    handles.insert(namespace, Arc::clone(&handle));
    handle
}

/// Clears every recorded backend choice. For tests only.
pub async fn reset_shared_handles() {
    HANDLES.lock().await.clear();
}
