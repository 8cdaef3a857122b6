//! Raw OMDB API response types and defensive parsing
//!
//! OMDB is loosely structured: every field is a string, absent values are
//! the literal `"N/A"`, dates look like `"01 Jan 2020"` and runtimes like
//! `"136 min"`. Parsing is field-wise: an unparseable field becomes
//! `None`/empty rather than failing the whole record.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{candidate::ImportCandidate, ContentKind};

/// Treats OMDB's `"N/A"` sentinel (and empty strings) as absent
pub(crate) fn clean(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty() && *s != "N/A")
}

/// Parses OMDB release dates; tries `01 Jan 2020` then ISO `2020-01-01`
pub(crate) fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() || raw == "N/A" {
        return None;
    }
    for format in ["%d %b %Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Parses `"136 min"`-style runtimes by taking the first numeric token
pub(crate) fn parse_runtime_minutes(raw: &str) -> Option<i32> {
    if raw.is_empty() || raw == "N/A" {
        return None;
    }
    raw.split_whitespace().find_map(|part| part.parse::<i32>().ok())
}

/// `GET /?s=<query>` response envelope
///
/// OMDB reports failure in-band: HTTP 200 with `"Response": "False"`.
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbSearchResponse {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Search", default)]
    pub search: Vec<OmdbSearchItem>,
}

impl OmdbSearchResponse {
    pub fn is_success(&self) -> bool {
        self.response == "True"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbSearchItem {
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "imdbID", default)]
    pub imdb_id: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

impl OmdbSearchItem {
    pub fn into_candidate(self, kind: ContentKind) -> ImportCandidate {
        let mut candidate = ImportCandidate::new(kind);
        candidate.imdb_id = clean(self.imdb_id.as_deref()).map(str::to_string);
        candidate.title = clean(self.title.as_deref()).unwrap_or_default().to_string();
        candidate.poster_url = clean(self.poster.as_deref()).unwrap_or_default().to_string();
        // "2010" / "2008–2013" style years never parse as full dates
        candidate.release_date = self.year.as_deref().and_then(parse_loose_date);
        candidate
    }
}

/// `GET /?i=<imdb id>&plot=full` response
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbTitle {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Plot", default)]
    pub plot: Option<String>,
    #[serde(rename = "Released", default)]
    pub released: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
    #[serde(rename = "Runtime", default)]
    pub runtime: Option<String>,
    #[serde(rename = "imdbID", default)]
    pub imdb_id: Option<String>,
    #[serde(rename = "Genre", default)]
    pub genre: Option<String>,
    #[serde(rename = "Director", default)]
    pub director: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "totalSeasons", default)]
    pub total_seasons: Option<String>,
}

impl OmdbTitle {
    pub fn is_success(&self) -> bool {
        self.response == "True"
    }

    /// OMDB reports `"movie"` or `"series"`; anything else is treated as a
    /// TV show, matching how the catalog buckets non-movie content
    pub fn content_kind(&self) -> ContentKind {
        match self.kind.as_deref() {
            Some("movie") => ContentKind::Movie,
            _ => ContentKind::TvShow,
        }
    }

    pub fn into_candidate(self) -> ImportCandidate {
        let kind = self.content_kind();
        let mut candidate = ImportCandidate::new(kind);
        candidate.imdb_id = clean(self.imdb_id.as_deref()).map(str::to_string);
        candidate.title = clean(self.title.as_deref()).unwrap_or_default().to_string();
        candidate.description = clean(self.plot.as_deref()).unwrap_or_default().to_string();
        candidate.release_date = self.released.as_deref().and_then(parse_loose_date);
        candidate.poster_url = clean(self.poster.as_deref()).unwrap_or_default().to_string();
        candidate.runtime = self.runtime.as_deref().and_then(parse_runtime_minutes);
        candidate.director = clean(self.director.as_deref()).map(str::to_string);
        candidate.genres = self
            .genre
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty() && *g != "N/A")
            .map(str::to_string)
            .collect();
        if kind == ContentKind::TvShow {
            candidate.total_seasons = self
                .total_seasons
                .as_deref()
                .and_then(|s| s.parse::<i32>().ok());
        }
        candidate
    }
}
