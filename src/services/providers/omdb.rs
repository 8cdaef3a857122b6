//! OMDB adapter
//!
//! OMDB signals failure in-band (HTTP 200 with `"Response": "False"`), so
//! success is checked on the decoded body, not just the status code. There
//! is no discovery surface; the default empty implementation stands.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::db::cache::{Cache, CacheKey};
use crate::error::AppResult;
use crate::models::omdb::{OmdbSearchResponse, OmdbTitle};
use crate::models::{ContentKind, ImportCandidate, ProviderId};

use super::MetadataProvider;

pub const PROVIDER_NAME: &str = "omdb";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TTL: u64 = 86_400;
const SEARCH_TTL: u64 = 60;

pub struct OmdbProvider {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl OmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Cache) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            api_url,
            cache,
        })
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Option<T> {
        let mut query: Vec<(&str, String)> = vec![("apikey", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let response = match self.http.get(&self.api_url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "OMDB request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "OMDB returned an error status");
            return None;
        }
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "OMDB response body did not decode");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbProvider {
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

        let media_type = match kind {
            ContentKind::Movie => "movie",
            ContentKind::TvShow => "series",
        };
        let params = [
            ("s", query.to_string()),
            ("type", media_type.to_string()),
        ];
        let Some(response) = self.get_json::<OmdbSearchResponse>(&params).await else {
            return Ok(Vec::new());
        };
        if !response.is_success() {
            return Ok(Vec::new());
        }

        let hits: Vec<ImportCandidate> = response
            .search
            .into_iter()
            .map(|item| item.into_candidate(kind))
            .collect();
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
        let ProviderId::Imdb(imdb_id) = id else {
            return Ok(None);
        };
        let key = CacheKey::Detail {
            provider: PROVIDER_NAME,
            kind,
            id: imdb_id.clone(),
        };
        if let Some(hit) = self.cache.get_from_cache(&key).await {
            return Ok(Some(hit));
        }
        if !self.enabled() {
            return Ok(None);
        }

        let params = [("i", imdb_id.clone()), ("plot", "full".to_string())];
        let Some(title) = self.get_json::<OmdbTitle>(&params).await else {
            return Ok(None);
        };
        if !title.is_success() {
            return Ok(None);
        }

        // The record's own Type field decides movie vs series, not the
        // caller's guess
        let candidate = title.into_candidate();
        self.cache.set_in_background(&key, &candidate, DETAIL_TTL);
        Ok(Some(candidate))
    }
}
