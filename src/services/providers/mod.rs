//! External metadata provider adapters
//!
//! Each adapter normalizes one provider's wire format into
//! [`ImportCandidate`] and absorbs provider trouble: timeouts, non-2xx
//! responses and undecodable bodies all degrade to `None`/empty so a flaky
//! provider can never take the catalog down with it.

pub mod omdb;
pub mod tmdb;

use std::sync::Arc;

use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{ContentKind, ImportCandidate, ProviderId};

pub use omdb::OmdbProvider;
pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lightweight hits for a query; empty on provider failure
    async fn search(&self, query: &str, kind: ContentKind) -> AppResult<Vec<ImportCandidate>>;

    /// Full record for one provider id; `None` when the provider fails,
    /// the id is unknown, or the id type is not this provider's
    async fn fetch_detail(
        &self,
        id: &ProviderId,
        kind: ContentKind,
    ) -> AppResult<Option<ImportCandidate>>;

    /// Popular titles tagged with any of the given genre names; providers
    /// without a discovery surface return nothing
    async fn discover_by_genres(&self, genres: Vec<String>) -> AppResult<Vec<ImportCandidate>> {
        let _ = genres;
        Ok(Vec::new())
    }
}

/// Which adapter a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKey {
    Tmdb,
    Omdb,
}

impl Default for ProviderKey {
    fn default() -> Self {
        ProviderKey::Tmdb
    }
}

/// Holds one adapter per provider; TMDB is the primary used for
/// recommendation discovery
#[derive(Clone)]
pub struct ProviderRegistry {
    tmdb: Arc<dyn MetadataProvider>,
    omdb: Arc<dyn MetadataProvider>,
}

impl ProviderRegistry {
    pub fn new(tmdb: Arc<dyn MetadataProvider>, omdb: Arc<dyn MetadataProvider>) -> Self {
        Self { tmdb, omdb }
    }

    pub fn get(&self, key: ProviderKey) -> &Arc<dyn MetadataProvider> {
        match key {
            ProviderKey::Tmdb => &self.tmdb,
            ProviderKey::Omdb => &self.omdb,
        }
    }

    /// Routes a provider id to the adapter that understands it: numeric ids
    /// belong to TMDB, IMDB-style string ids to OMDB
    pub fn for_id(&self, id: &ProviderId) -> &Arc<dyn MetadataProvider> {
        match id {
            ProviderId::Tmdb(_) => &self.tmdb,
            ProviderId::Imdb(_) => &self.omdb,
        }
    }

    pub fn primary(&self) -> &Arc<dyn MetadataProvider> {
        &self.tmdb
    }
}
