use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display};

pub mod candidate;
pub mod omdb;
pub mod tmdb;

pub use candidate::ImportCandidate;

/// Identifier for content at an external metadata provider
///
/// TMDB uses numeric ids, OMDB addresses titles by IMDB-style string ids
/// (e.g. "tt1375666"). Deserialized untagged so import requests can pass
/// either a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderId {
    /// TMDB numeric id
    Tmdb(i64),
    /// IMDB-style string id (e.g. "tt1375666")
    Imdb(String),
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Tmdb(id) => write!(f, "{}", id),
            ProviderId::Imdb(id) => write!(f, "{}", id),
        }
    }
}

/// Kind of catalog content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    TvShow,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::TvShow => "tv_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(ContentKind::Movie),
            "tv_show" => Some(ContentKind::TvShow),
            _ => None,
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Watch state of a catalog record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watching,
    Completed,
    Wishlist,
    Paused,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 4] = [
        WatchStatus::Watching,
        WatchStatus::Completed,
        WatchStatus::Wishlist,
        WatchStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watching => "watching",
            WatchStatus::Completed => "completed",
            WatchStatus::Wishlist => "wishlist",
            WatchStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "watching" => Some(WatchStatus::Watching),
            "completed" => Some(WatchStatus::Completed),
            "wishlist" => Some(WatchStatus::Wishlist),
            "paused" => Some(WatchStatus::Paused),
            _ => None,
        }
    }
}

impl Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for WatchStatus {
    fn default() -> Self {
        WatchStatus::Wishlist
    }
}

/// A genre tag; globally unique by name, created on first sight during import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Canonical, provider-agnostic catalog record for a movie or TV show
///
/// `tmdb_id` is unique across the catalog when present; `imdb_id` is unique
/// case-insensitively. TV-only fields are `None`/empty for movies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalContent {
    pub id: i64,
    pub title: String,
    pub director: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: String,
    pub runtime: Option<i32>,
    pub content_type: ContentKind,
    pub status: WatchStatus,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub genres: Vec<String>,
    pub total_seasons: Option<i32>,
    pub total_episodes: Option<i32>,
    #[serde(default)]
    pub episodes_per_season: HashMap<i32, i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new canonical record
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub director: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: String,
    pub runtime: Option<i32>,
    pub content_type: ContentKind,
    pub status: WatchStatus,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    /// Resolved genre ids, insertion order preserved
    pub genre_ids: Vec<i64>,
    pub total_seasons: Option<i32>,
    pub total_episodes: Option<i32>,
    pub episodes_per_season: HashMap<i32, i32>,
}

/// Partial update applied to an existing record; `None` fields are untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub director: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub runtime: Option<i32>,
    pub status: Option<WatchStatus>,
}

/// One entry of a cached recommendation pool
///
/// Catalog-backed entries carry the local id (and tmdb id when known);
/// provider-discovery entries carry only the tmdb id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationEntry {
    pub id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub content_type: ContentKind,
    pub poster_url: String,
    pub genres: Vec<String>,
}

impl From<&CanonicalContent> for RecommendationEntry {
    fn from(content: &CanonicalContent) -> Self {
        Self {
            id: Some(content.id),
            tmdb_id: content.tmdb_id,
            title: content.title.clone(),
            content_type: content.content_type,
            poster_url: content.poster_url.clone(),
            genres: content.genres.clone(),
        }
    }
}

impl From<&ImportCandidate> for RecommendationEntry {
    fn from(candidate: &ImportCandidate) -> Self {
        Self {
            id: None,
            tmdb_id: candidate.tmdb_id,
            title: candidate.title.clone(),
            content_type: candidate.kind,
            poster_url: candidate.poster_url.clone(),
            genres: candidate.genres.clone(),
        }
    }
}

/// A rating signal with the genres of its content pre-joined
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSignal {
    pub content_id: i64,
    pub value: i32,
    pub genres: Vec<String>,
}

/// A content id with its genre names, used for watch-history and
/// completed-status signals
#[derive(Debug, Clone, PartialEq)]
pub struct GenreTagged {
    pub content_id: i64,
    pub genres: Vec<String>,
}

/// Aggregate catalog counts for the statistics endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogStatistics {
    pub total: i64,
    pub movies: i64,
    pub tv_shows: i64,
    pub status_counts: HashMap<String, i64>,
    pub average_rating: f64,
}
