use std::fmt::Display;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::ContentKind;

/// Keys for the shared TTL cache
///
/// Detail and search keys are namespaced per provider and kind so the two
/// adapters never collide; recommendation pools are keyed by pool size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full detail record for one provider id (24h)
    Detail {
        provider: &'static str,
        kind: ContentKind,
        id: String,
    },
    /// Search result list for a normalized query (60s)
    Search {
        provider: &'static str,
        kind: ContentKind,
        query: String,
    },
    /// Provider genre name → id mapping (24h)
    GenreMap { provider: &'static str },
    /// Recommendation pool for one pool size (5m)
    Recommendations { pool_size: usize },
}

/// Prefix shared by all recommendation pool keys; used for coarse
/// invalidation when a catalog mutation makes affinity inputs stale
pub const RECOMMENDATIONS_PREFIX: &str = "recs:";

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Detail { provider, kind, id } => {
                write!(f, "meta:{}:{}:{}", provider, kind, id)
            }
            CacheKey::Search {
                provider,
                kind,
                query,
            } => write!(
                f,
                "search:{}:{}:{}",
                provider,
                kind,
                query.trim().to_lowercase()
            ),
            CacheKey::GenreMap { provider } => write!(f, "genre-map:{}", provider),
            CacheKey::Recommendations { pool_size } => {
                write!(f, "{}{}", RECOMMENDATIONS_PREFIX, pool_size)
            }
        }
    }
}

/// Raw key-value store with TTL semantics
///
/// Implemented by the Redis client in production and by an in-memory map in
/// tests. Writes are fire-and-forget so cache latency never rides on the
/// response path.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set_background(&self, key: String, value: String, ttl: u64);
    async fn delete(&self, key: &str) -> AppResult<()>;
    async fn delete_prefix(&self, prefix: &str) -> AppResult<()>;
}

/// Cache handler shared by provider adapters and the recommendation engine
///
/// A cache failure is never allowed to abort the caller's read or write
/// path: reads degrade to a miss (the caller recomputes from the source of
/// truth) and invalidations are logged and dropped.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Retrieves and deserializes a cached value; any backend or decode
    /// failure is reported as a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Option<T> {
        match self.backend.get(&key.to_string()).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Serializes and stores a value without blocking the caller
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };
        self.backend.set_background(key.to_string(), json, ttl);
    }

    /// Removes a single entry; failures are logged and swallowed
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.backend.delete(&key.to_string()).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }

    /// Removes every entry under a key prefix; failures are logged and
    /// swallowed so mutation handlers never fail on cache trouble
    pub async fn invalidate_prefix(&self, prefix: &str) {
        if let Err(e) = self.backend.delete_prefix(prefix).await {
            tracing::warn!(prefix = %prefix, error = %e, "Cache prefix invalidation failed");
        }
    }
}

/// Read-through caching: return the cached value when present, otherwise
/// run the block, store its result with the given TTL and return it.
/// The block's error short-circuits without caching anything.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await {
            Ok(cached)
        } else {
            match $block.await {
                Ok(value) => {
                    $cache.set_in_background(&$key, &value, $ttl);
                    Ok(value)
                }
                Err(e) => Err(e),
            }
        }
    }};
}

/// In-memory backend for unit tests; records TTLs for assertions
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryBackend {
        entries: Mutex<HashMap<String, (String, u64)>>,
    }

    impl MemoryBackend {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn ttl_of(&self, key: &str) -> Option<u64> {
            self.entries
                .lock()
                .expect("cache mutex poisoned")
                .get(key)
                .map(|(_, ttl)| *ttl)
        }

        pub fn contains(&self, key: &str) -> bool {
            self.entries
                .lock()
                .expect("cache mutex poisoned")
                .contains_key(key)
        }

        pub fn len(&self) -> usize {
            self.entries.lock().expect("cache mutex poisoned").len()
        }
    }

    #[async_trait::async_trait]
    impl CacheBackend for MemoryBackend {
        async fn get(&self, key: &str) -> AppResult<Option<String>> {
            Ok(self
                .entries
                .lock()
                .expect("cache mutex poisoned")
                .get(key)
                .map(|(value, _)| value.clone()))
        }

        fn set_background(&self, key: String, value: String, ttl: u64) {
            self.entries
                .lock()
                .expect("cache mutex poisoned")
                .insert(key, (value, ttl));
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.entries
                .lock()
                .expect("cache mutex poisoned")
                .remove(key);
            Ok(())
        }

        async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
            self.entries
                .lock()
                .expect("cache mutex poisoned")
                .retain(|key, _| !key.starts_with(prefix));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryBackend;
    use super::*;
    use crate::error::AppError;

    #[test]
    fn cache_key_display_detail() {
        let key = CacheKey::Detail {
            provider: "tmdb",
            kind: ContentKind::Movie,
            id: "603".to_string(),
        };
        assert_eq!(format!("{}", key), "meta:tmdb:movie:603");
    }

    #[test]
    fn cache_key_display_search_normalizes_query() {
        let key = CacheKey::Search {
            provider: "omdb",
            kind: ContentKind::TvShow,
            query: "  The WIRE ".to_string(),
        };
        assert_eq!(format!("{}", key), "search:omdb:tv_show:the wire");
    }

    #[test]
    fn cache_key_display_genre_map() {
        let key = CacheKey::GenreMap { provider: "tmdb" };
        assert_eq!(format!("{}", key), "genre-map:tmdb");
    }

    #[test]
    fn cache_key_display_recommendations_uses_shared_prefix() {
        let key = CacheKey::Recommendations { pool_size: 24 };
        let rendered = format!("{}", key);
        assert_eq!(rendered, "recs:24");
        assert!(rendered.starts_with(RECOMMENDATIONS_PREFIX));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = MemoryBackend::new();
        let cache = Cache::new(backend.clone());
        let key = CacheKey::GenreMap { provider: "tmdb" };

        cache.set_in_background(&key, &vec!["Action".to_string()], 60);
        let value: Option<Vec<String>> = cache.get_from_cache(&key).await;

        assert_eq!(value, Some(vec!["Action".to_string()]));
        assert_eq!(backend.ttl_of("genre-map:tmdb"), Some(60));
    }

    #[tokio::test]
    async fn undecodable_entry_reads_as_miss() {
        let backend = MemoryBackend::new();
        backend.set_background("genre-map:tmdb".to_string(), "not json".to_string(), 60);
        let cache = Cache::new(backend);

        let value: Option<Vec<String>> = cache
            .get_from_cache(&CacheKey::GenreMap { provider: "tmdb" })
            .await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn invalidate_prefix_spares_other_namespaces() {
        let backend = MemoryBackend::new();
        let cache = Cache::new(backend.clone());

        cache.set_in_background(&CacheKey::Recommendations { pool_size: 10 }, &vec![1], 300);
        cache.set_in_background(&CacheKey::Recommendations { pool_size: 24 }, &vec![2], 300);
        cache.set_in_background(&CacheKey::GenreMap { provider: "tmdb" }, &vec![3], 300);

        cache.invalidate_prefix(RECOMMENDATIONS_PREFIX).await;

        assert!(!backend.contains("recs:10"));
        assert!(!backend.contains("recs:24"));
        assert!(backend.contains("genre-map:tmdb"));
    }

    #[tokio::test]
    async fn cached_macro_computes_once_then_hits() {
        let backend = MemoryBackend::new();
        let cache = Cache::new(backend.clone());
        let key = CacheKey::Recommendations { pool_size: 5 };

        let first: AppResult<Vec<i64>> =
            cached!(cache, key, 300, async { Ok::<_, AppError>(vec![1, 2, 3]) });
        assert_eq!(first.unwrap(), vec![1, 2, 3]);
        assert_eq!(backend.ttl_of("recs:5"), Some(300));

        // Second pass must serve the cached value, not the new block result
        let second: AppResult<Vec<i64>> =
            cached!(cache, key, 300, async { Ok::<_, AppError>(vec![9]) });
        assert_eq!(second.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cached_macro_does_not_cache_failures() {
        let backend = MemoryBackend::new();
        let cache = Cache::new(backend.clone());
        let key = CacheKey::Recommendations { pool_size: 7 };

        let failed: AppResult<Vec<i64>> = cached!(cache, key, 300, async {
            Err::<Vec<i64>, _>(AppError::Internal("boom".to_string()))
        });
        assert!(failed.is_err());
        assert_eq!(backend.len(), 0);
    }
}
