//! Provider search with best-effort enrichment
//!
//! TMDB list items are thin (no director, runtime or IMDB id), so each hit
//! from the primary provider is topped up with its detail record. A failed
//! enrichment leaves the lightweight hit in place; the search as a whole
//! only fails on invalid input.

use crate::error::{AppError, AppResult};
use crate::models::{ContentKind, ImportCandidate, ProviderId};
use crate::services::providers::{ProviderKey, ProviderRegistry};

#[derive(Clone)]
pub struct SearchService {
    registry: ProviderRegistry,
}

impl SearchService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub async fn search(
        &self,
        provider: ProviderKey,
        query: &str,
        kind: ContentKind,
    ) -> AppResult<Vec<ImportCandidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }

        let adapter = self.registry.get(provider);
        let hits = adapter.search(query, kind).await?;

        // OMDB hits are already as full as a search can make them
        if provider != ProviderKey::Tmdb {
            return Ok(hits);
        }

        let mut enriched = Vec::with_capacity(hits.len());
        for mut hit in hits {
            if let Some(tmdb_id) = hit.tmdb_id {
                match adapter.fetch_detail(&ProviderId::Tmdb(tmdb_id), hit.kind).await {
                    Ok(Some(detail)) => hit.merge_detail(detail),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(tmdb_id, error = %e, "Search hit enrichment failed");
                    }
                }
            }
            enriched.push(hit);
        }
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockMetadataProvider;
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn hit(tmdb_id: i64, title: &str) -> ImportCandidate {
        let mut candidate = ImportCandidate::new(ContentKind::Movie);
        candidate.tmdb_id = Some(tmdb_id);
        candidate.title = title.to_string();
        candidate
    }

    fn registry(tmdb: MockMetadataProvider, omdb: MockMetadataProvider) -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(tmdb), Arc::new(omdb))
    }

    #[tokio::test]
    async fn empty_query_is_invalid_input() {
        let service = SearchService::new(registry(
            MockMetadataProvider::new(),
            MockMetadataProvider::new(),
        ));

        let result = service
            .search(ProviderKey::Tmdb, "   ", ContentKind::Movie)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn tmdb_hits_are_enriched_with_detail() {
        let mut tmdb = MockMetadataProvider::new();
        tmdb.expect_search()
            .with(eq("matrix"), eq(ContentKind::Movie))
            .returning(|_, _| Ok(vec![hit(603, "The Matrix")]));
        tmdb.expect_fetch_detail()
            .with(eq(ProviderId::Tmdb(603)), eq(ContentKind::Movie))
            .returning(|_, _| {
                let mut detail = ImportCandidate::new(ContentKind::Movie);
                detail.director = Some("Lana Wachowski".to_string());
                detail.imdb_id = Some("tt0133093".to_string());
                Ok(Some(detail))
            });

        let service = SearchService::new(registry(tmdb, MockMetadataProvider::new()));
        let hits = service
            .search(ProviderKey::Tmdb, "matrix", ContentKind::Movie)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "The Matrix");
        assert_eq!(hits[0].director.as_deref(), Some("Lana Wachowski"));
        assert_eq!(hits[0].imdb_id.as_deref(), Some("tt0133093"));
    }

    #[tokio::test]
    async fn failed_enrichment_keeps_the_lightweight_hit() {
        let mut tmdb = MockMetadataProvider::new();
        tmdb.expect_search()
            .returning(|_, _| Ok(vec![hit(603, "The Matrix"), hit(604, "Reloaded")]));
        tmdb.expect_fetch_detail()
            .with(eq(ProviderId::Tmdb(603)), eq(ContentKind::Movie))
            .returning(|_, _| Ok(None));
        tmdb.expect_fetch_detail()
            .with(eq(ProviderId::Tmdb(604)), eq(ContentKind::Movie))
            .returning(|_, _| {
                let mut detail = ImportCandidate::new(ContentKind::Movie);
                detail.runtime = Some(138);
                Ok(Some(detail))
            });

        let service = SearchService::new(registry(tmdb, MockMetadataProvider::new()));
        let hits = service
            .search(ProviderKey::Tmdb, "matrix", ContentKind::Movie)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "The Matrix");
        assert_eq!(hits[0].runtime, None);
        assert_eq!(hits[1].runtime, Some(138));
    }

    #[tokio::test]
    async fn omdb_hits_are_not_enriched() {
        let mut omdb = MockMetadataProvider::new();
        omdb.expect_search()
            .with(eq("wire"), eq(ContentKind::TvShow))
            .returning(|_, _| {
                let mut candidate = ImportCandidate::new(ContentKind::TvShow);
                candidate.imdb_id = Some("tt0306414".to_string());
                candidate.title = "The Wire".to_string();
                Ok(vec![candidate])
            });
        omdb.expect_fetch_detail().times(0);

        let service = SearchService::new(registry(MockMetadataProvider::new(), omdb));
        let hits = service
            .search(ProviderKey::Omdb, "wire", ContentKind::TvShow)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "The Wire");
    }
}
