//! Recommendation pool construction and maintenance
//!
//! A pool is built from the user's genre affinity and served from cache for
//! five minutes. Resolution order:
//!   1. no scored genres at all: fall back to the best-rated catalog
//!      records the user has not touched, capped at ten
//!   2. catalog records tagged with the top three genres
//!   3. if the catalog has none, ask the primary provider's discovery
//!      surface, dropping anything already in the catalog
//!
//! After an import the cached pool is patched in place instead of rebuilt:
//! the imported title leaves the pool and one replacement is backfilled,
//! catalog first, discovery second. Any trouble during the patch just
//! invalidates the pool.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cached;
use crate::db::cache::{Cache, CacheKey};
use crate::db::{CatalogStore, RECOMMENDATIONS_PREFIX};
use crate::error::AppResult;
use crate::models::{CanonicalContent, RecommendationEntry};
use crate::services::providers::ProviderRegistry;
use crate::services::signals::SignalAggregator;

pub const DEFAULT_POOL_SIZE: usize = 24;

const RECOMMENDATIONS_TTL: u64 = 300;
const FALLBACK_LIMIT: usize = 10;
const TOP_GENRE_COUNT: usize = 3;

pub struct RecommendationEngine {
    store: Arc<dyn CatalogStore>,
    registry: ProviderRegistry,
    cache: Cache,
    aggregator: SignalAggregator,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn CatalogStore>, registry: ProviderRegistry, cache: Cache) -> Self {
        let aggregator = SignalAggregator::new(store.clone());
        Self {
            store,
            registry,
            cache,
            aggregator,
        }
    }

    pub async fn get_recommendations(
        &self,
        pool_size: usize,
    ) -> AppResult<Vec<RecommendationEntry>> {
        let key = CacheKey::Recommendations { pool_size };
        cached!(
            self.cache,
            key,
            RECOMMENDATIONS_TTL,
            self.build_pool(pool_size)
        )
    }

    async fn build_pool(&self, pool_size: usize) -> AppResult<Vec<RecommendationEntry>> {
        let affinity = self.aggregator.aggregate().await?;
        let excluded: Vec<i64> = affinity.excluded.iter().copied().collect();

        if affinity.scores.is_empty() {
            let limit = FALLBACK_LIMIT.min(pool_size) as i64;
            let rows = self.store.top_rated_excluding(excluded, limit).await?;
            return Ok(rows.iter().map(RecommendationEntry::from).collect());
        }

        let top_genres = affinity.scores.top(TOP_GENRE_COUNT);
        let rows = self
            .store
            .by_genres_excluding(top_genres.clone(), excluded, pool_size as i64)
            .await?;
        if !rows.is_empty() {
            return Ok(rows.iter().map(RecommendationEntry::from).collect());
        }

        self.discover_pool(top_genres, pool_size).await
    }

    /// Provider discovery, filtered down to titles the catalog does not
    /// already hold
    async fn discover_pool(
        &self,
        genres: Vec<String>,
        pool_size: usize,
    ) -> AppResult<Vec<RecommendationEntry>> {
        let candidates = self.registry.primary().discover_by_genres(genres).await?;
        let known = self.store.known_tmdb_ids().await?;

        let mut seen = HashSet::new();
        let entries = candidates
            .iter()
            .filter(|candidate| {
                candidate
                    .tmdb_id
                    .map_or(false, |id| !known.contains(&id) && seen.insert(id))
            })
            .take(pool_size)
            .map(RecommendationEntry::from)
            .collect();
        Ok(entries)
    }

    /// Patches the cached pool after a successful import; a missing pool is
    /// a no-op and a failed backfill invalidates the pool instead
    pub async fn post_import_replace(&self, imported: &CanonicalContent, pool_size: usize) {
        let key = CacheKey::Recommendations { pool_size };
        let Some(pool) = self
            .cache
            .get_from_cache::<Vec<RecommendationEntry>>(&key)
            .await
        else {
            return;
        };

        let before = pool.len();
        let mut pool = drop_imported(pool, imported.id, imported.tmdb_id);
        if pool.len() == before {
            return;
        }

        if pool.len() < pool_size {
            match self.backfill(&pool, imported).await {
                Ok(Some(entry)) => pool.push(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Pool backfill failed, invalidating cached pool");
                    self.cache.invalidate(&key).await;
                    return;
                }
            }
        }

        self.cache.set_in_background(&key, &pool, RECOMMENDATIONS_TTL);
    }

    async fn backfill(
        &self,
        pool: &[RecommendationEntry],
        imported: &CanonicalContent,
    ) -> AppResult<Option<RecommendationEntry>> {
        let affinity = self.aggregator.aggregate().await?;
        let mut excluded: Vec<i64> = affinity.excluded.into_iter().collect();
        excluded.push(imported.id);
        excluded.extend(pool.iter().filter_map(|entry| entry.id));

        let genres = imported.genres.clone();
        if !genres.is_empty() {
            let rows = self
                .store
                .by_genres_excluding(genres.clone(), excluded, 1)
                .await?;
            if let Some(row) = rows.first() {
                return Ok(Some(RecommendationEntry::from(row)));
            }
        }

        let pool_tmdb: HashSet<i64> = pool.iter().filter_map(|entry| entry.tmdb_id).collect();
        let known = self.store.known_tmdb_ids().await?;
        let candidates = self.registry.primary().discover_by_genres(genres).await?;
        let entry = candidates
            .iter()
            .find(|candidate| {
                candidate
                    .tmdb_id
                    .map_or(false, |id| !known.contains(&id) && !pool_tmdb.contains(&id))
            })
            .map(RecommendationEntry::from);
        Ok(entry)
    }

    /// Drops every cached pool; called on any catalog mutation that can
    /// shift the affinity signals
    pub async fn invalidate_pools(&self) {
        self.cache.invalidate_prefix(RECOMMENDATIONS_PREFIX).await;
    }
}

fn drop_imported(
    pool: Vec<RecommendationEntry>,
    local_id: i64,
    tmdb_id: Option<i64>,
) -> Vec<RecommendationEntry> {
    pool.into_iter()
        .filter(|entry| {
            entry.id != Some(local_id) && !(tmdb_id.is_some() && entry.tmdb_id == tmdb_id)
        })
        .collect()
}
