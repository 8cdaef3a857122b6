//! TMDB adapter
//!
//! A movie record is assembled from three endpoints: the detail response,
//! plus credits (director) and external ids (IMDB id) fetched concurrently.
//! The secondary fetches are non-fatal; losing them yields a record with
//! those fields unset. TV records come from the detail endpoint alone.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::db::cache::{Cache, CacheKey};
use crate::error::AppResult;
use crate::models::tmdb::{
    TmdbCredits, TmdbExternalIds, TmdbGenreList, TmdbMovie, TmdbResultPage, TmdbTv,
};
use crate::models::{ContentKind, ImportCandidate, ProviderId};

use super::MetadataProvider;

pub const PROVIDER_NAME: &str = "tmdb";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TTL: u64 = 86_400;
const SEARCH_TTL: u64 = 60;
const GENRE_MAP_TTL: u64 = 86_400;
const SEARCH_LIMIT: usize = 10;

pub struct TmdbProvider {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    image_base: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        image_base: String,
        cache: Cache,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            api_url,
            image_base,
            cache,
        })
    }

    /// An unconfigured adapter answers every call with nothing
    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// GET + decode with every failure mode collapsed into `None`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Option<T> {
        let url = format!("{}{}", self.api_url, path);
        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let response = match self.http.get(&url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "TMDB request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(path = %path, status = %response.status(), "TMDB returned an error status");
            return None;
        }
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "TMDB response body did not decode");
                None
            }
        }
    }

    async fn fetch_movie(&self, tmdb_id: i64) -> Option<ImportCandidate> {
        let key = CacheKey::Detail {
            provider: PROVIDER_NAME,
            kind: ContentKind::Movie,
            id: tmdb_id.to_string(),
        };
        if let Some(hit) = self.cache.get_from_cache(&key).await {
            return Some(hit);
        }

        let movie: TmdbMovie = self.get_json(&format!("/movie/{}", tmdb_id), &[]).await?;

        let credits_path = format!("/movie/{}/credits", tmdb_id);
        let external_path = format!("/movie/{}/external_ids", tmdb_id);
        let (credits, external): (Option<TmdbCredits>, Option<TmdbExternalIds>) = tokio::join!(
            self.get_json(&credits_path, &[]),
            self.get_json(&external_path, &[]),
        );

        let mut candidate = movie.into_candidate(&self.image_base);
        if let Some(credits) = credits {
            candidate.director = credits.director();
        }
        if let Some(external) = external {
            candidate.imdb_id = external.imdb_id.filter(|id| !id.is_empty());
        }

        self.cache.set_in_background(&key, &candidate, DETAIL_TTL);
        Some(candidate)
    }

    async fn fetch_tv(&self, tmdb_id: i64) -> Option<ImportCandidate> {
        let key = CacheKey::Detail {
            provider: PROVIDER_NAME,
            kind: ContentKind::TvShow,
            id: tmdb_id.to_string(),
        };
        if let Some(hit) = self.cache.get_from_cache(&key).await {
            return Some(hit);
        }

        let tv: TmdbTv = self.get_json(&format!("/tv/{}", tmdb_id), &[]).await?;
        let candidate = tv.into_candidate(&self.image_base);

        self.cache.set_in_background(&key, &candidate, DETAIL_TTL);
        Some(candidate)
    }

    /// Cached genre id → name index, merged across the movie and TV lists
    async fn genre_index(&self) -> Option<HashMap<i64, String>> {
        let key = CacheKey::GenreMap {
            provider: PROVIDER_NAME,
        };
        if let Some(index) = self.cache.get_from_cache(&key).await {
            return Some(index);
        }

        let (movie, tv): (Option<TmdbGenreList>, Option<TmdbGenreList>) = tokio::join!(
            self.get_json("/genre/movie/list", &[]),
            self.get_json("/genre/tv/list", &[]),
        );
        if movie.is_none() && tv.is_none() {
            return None;
        }

        let mut index = HashMap::new();
        for list in [movie, tv].into_iter().flatten() {
            for genre in list.genres {
                index.insert(genre.id, genre.name);
            }
        }

        self.cache.set_in_background(&key, &index, GENRE_MAP_TTL);
        Some(index)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str, kind: ContentKind) -> AppResult<Vec<ImportCandidate>> {
        let key = CacheKey::Search {
            provider: PROVIDER_NAME,
            kind,
            query: query.to_string(),
        };
        if let Some(hits) = self.cache.get_from_cache(&key).await {
            return Ok(hits);
        }
        if !self.enabled() {
            return Ok(Vec::new());
        }

        let path = match kind {
            ContentKind::Movie => "/search/movie",
            ContentKind::TvShow => "/search/tv",
        };
        let Some(page) = self
            .get_json::<TmdbResultPage>(path, &[("query", query.to_string())])
            .await
        else {
            return Ok(Vec::new());
        };

        let genre_names = self.genre_index().await;
        let hits: Vec<ImportCandidate> = page
            .results
            .into_iter()
            .take(SEARCH_LIMIT)
            .map(|item| item.into_candidate(kind, &self.image_base, genre_names.as_ref()))
            .collect();

        // Only successful lookups are worth keeping for the next minute
        if !hits.is_empty() {
            self.cache.set_in_background(&key, &hits, SEARCH_TTL);
        }
        Ok(hits)
    }

    async fn fetch_detail(
        &self,
        id: &ProviderId,
        kind: ContentKind,
    ) -> AppResult<Option<ImportCandidate>> {
        let ProviderId::Tmdb(tmdb_id) = id else {
            return Ok(None);
        };
        if !self.enabled() {
            return Ok(None);
        }
        let candidate = match kind {
            ContentKind::Movie => self.fetch_movie(*tmdb_id).await,
            ContentKind::TvShow => self.fetch_tv(*tmdb_id).await,
        };
        Ok(candidate)
    }

    async fn discover_by_genres(&self, genres: Vec<String>) -> AppResult<Vec<ImportCandidate>> {
        if !self.enabled() || genres.is_empty() {
            return Ok(Vec::new());
        }
        let Some(index) = self.genre_index().await else {
            return Ok(Vec::new());
        };

        let by_name: HashMap<String, i64> = index
            .iter()
            .map(|(id, name)| (name.to_lowercase(), *id))
            .collect();
        let ids: Vec<String> = genres
            .iter()
            .filter_map(|name| by_name.get(&name.to_lowercase()))
            .map(i64::to_string)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let with_genres = ids.join(",");

        let params = [
            ("with_genres", with_genres),
            ("sort_by", "popularity.desc".to_string()),
        ];
        let (movies, shows): (Option<TmdbResultPage>, Option<TmdbResultPage>) = tokio::join!(
            self.get_json("/discover/movie", &params),
            self.get_json("/discover/tv", &params),
        );

        let mut candidates = Vec::new();
        if let Some(page) = movies {
            candidates.extend(
                page.results
                    .into_iter()
                    .map(|item| item.into_candidate(ContentKind::Movie, &self.image_base, Some(&index))),
            );
        }
        if let Some(page) = shows {
            candidates.extend(
                page.results
                    .into_iter()
                    .map(|item| item.into_candidate(ContentKind::TvShow, &self.image_base, Some(&index))),
            );
        }
        Ok(candidates)
    }
}
