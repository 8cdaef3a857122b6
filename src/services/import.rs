//! Import pipeline: provider record → canonical catalog row
//!
//! Dedup runs before any network call, so re-importing an existing title is
//! cheap and idempotent. A provider that cannot produce a usable record
//! (no response, or a record without a title) fails the import; after a
//! successful insert the cached recommendation pool is patched.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    CanonicalContent, ContentKind, ImportCandidate, NewContent, ProviderId, WatchStatus,
};
use crate::services::providers::ProviderRegistry;
use crate::services::recommendations::{RecommendationEngine, DEFAULT_POOL_SIZE};
use crate::db::CatalogStore;

pub struct ImportOutcome {
    pub content: CanonicalContent,
    pub already_exists: bool,
}

pub struct ImportService {
    store: Arc<dyn CatalogStore>,
    registry: ProviderRegistry,
    engine: Arc<RecommendationEngine>,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        registry: ProviderRegistry,
        engine: Arc<RecommendationEngine>,
    ) -> Self {
        Self {
            store,
            registry,
            engine,
        }
    }

    pub async fn import(
        &self,
        id: ProviderId,
        kind: ContentKind,
        status: Option<WatchStatus>,
    ) -> AppResult<ImportOutcome> {
        if let Some(existing) = self.find_existing(&id).await? {
            tracing::debug!(provider_id = %id, content_id = existing.id, "Import hit an existing record");
            return Ok(ImportOutcome {
                content: existing,
                already_exists: true,
            });
        }

        let adapter = self.registry.for_id(&id);
        let candidate = adapter
            .fetch_detail(&id, kind)
            .await?
            .filter(|candidate| !candidate.title.is_empty())
            .ok_or_else(|| {
                AppError::ImportFailed(format!(
                    "no usable record for {} at {}",
                    id,
                    adapter.name()
                ))
            })?;

        let mut genre_ids = Vec::new();
        for name in candidate.deduped_genres() {
            genre_ids.push(self.store.get_or_create_genre(&name).await?.id);
        }

        let new = build_new_content(&candidate, status.unwrap_or_default(), genre_ids);
        let content = self.store.create_content(new).await?;
        tracing::info!(content_id = content.id, title = %content.title, "Imported content");

        self.engine
            .post_import_replace(&content, DEFAULT_POOL_SIZE)
            .await;

        Ok(ImportOutcome {
            content,
            already_exists: false,
        })
    }

    async fn find_existing(&self, id: &ProviderId) -> AppResult<Option<CanonicalContent>> {
        match id {
            ProviderId::Tmdb(tmdb_id) => self.store.find_by_tmdb_id(*tmdb_id).await,
            ProviderId::Imdb(imdb_id) => self.store.find_by_imdb_id(imdb_id).await,
        }
    }
}

fn build_new_content(
    candidate: &ImportCandidate,
    status: WatchStatus,
    genre_ids: Vec<i64>,
) -> NewContent {
    let is_tv = candidate.kind == ContentKind::TvShow;
    NewContent {
        title: candidate.title.clone(),
        director: candidate.director.clone().unwrap_or_default(),
        description: candidate.description.clone(),
        release_date: candidate.release_date,
        poster_url: candidate.poster_url.clone(),
        runtime: candidate.runtime,
        content_type: candidate.kind,
        status,
        tmdb_id: candidate.tmdb_id,
        imdb_id: candidate.imdb_id.clone(),
        genre_ids,
        // A show with no season data still counts as one season of
        // zero known episodes
        total_seasons: is_tv.then(|| candidate.total_seasons.unwrap_or(1)),
        total_episodes: is_tv.then(|| candidate.total_episodes.unwrap_or(0)),
        episodes_per_season: candidate.episodes_per_season.clone(),
    }
}
