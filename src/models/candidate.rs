use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ContentKind;

/// Provider-shaped normalized payload, the single shape every adapter maps
/// its response into before import or search output
///
/// Genres are raw provider names, not yet resolved to catalog rows. All
/// provider-optional fields are explicit `Option`s; a search hit starts
/// lightweight and may later be enriched by a detail fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportCandidate {
    pub kind: ContentKind,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: String,
    pub runtime: Option<i32>,
    pub director: Option<String>,
    pub genres: Vec<String>,
    pub total_seasons: Option<i32>,
    pub total_episodes: Option<i32>,
    #[serde(default)]
    pub episodes_per_season: HashMap<i32, i32>,
}

impl ImportCandidate {
    /// Empty candidate of the given kind, filled field by field by adapters
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            tmdb_id: None,
            imdb_id: None,
            title: String::new(),
            description: String::new(),
            release_date: None,
            poster_url: String::new(),
            runtime: None,
            director: None,
            genres: Vec::new(),
            total_seasons: None,
            total_episodes: None,
            episodes_per_season: HashMap::new(),
        }
    }

    /// Folds a full detail record into a lightweight search hit
    ///
    /// Detail fields win wherever they are present; the lightweight values
    /// survive when the detail record left a field empty, so a partially
    /// failed enrichment still returns a usable hit.
    pub fn merge_detail(&mut self, detail: ImportCandidate) {
        if !detail.title.is_empty() {
            self.title = detail.title;
        }
        if !detail.description.is_empty() {
            self.description = detail.description;
        }
        if !detail.poster_url.is_empty() {
            self.poster_url = detail.poster_url;
        }
        if detail.release_date.is_some() {
            self.release_date = detail.release_date;
        }
        if detail.runtime.is_some() {
            self.runtime = detail.runtime;
        }
        if detail.director.is_some() {
            self.director = detail.director;
        }
        if detail.imdb_id.is_some() {
            self.imdb_id = detail.imdb_id;
        }
        if !detail.genres.is_empty() {
            self.genres = detail.genres;
        }
        if detail.total_seasons.is_some() {
            self.total_seasons = detail.total_seasons;
        }
        if detail.total_episodes.is_some() {
            self.total_episodes = detail.total_episodes;
        }
        if !detail.episodes_per_season.is_empty() {
            self.episodes_per_season = detail.episodes_per_season;
        }
    }

    /// Genre names in candidate order with duplicates removed; this is the
    /// order the persisted record's genre set must follow
    pub fn deduped_genres(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for name in &self.genres {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
        seen
    }
}
