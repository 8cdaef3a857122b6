//! Raw TMDB API response types and their mapping into [`ImportCandidate`]
//!
//! TMDB addresses everything by numeric id and splits a full movie record
//! across three endpoints (detail, credits, external ids); the adapter in
//! `services::providers::tmdb` stitches those together.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

use super::{candidate::ImportCandidate, ContentKind};

/// Parses TMDB's ISO `YYYY-MM-DD` dates; empty or malformed input yields None
pub(crate) fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn poster_url(poster_path: Option<&str>, image_base: &str) -> String {
    match poster_path {
        Some(path) if !path.is_empty() => format!("{}{}", image_base, path),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

/// `GET /movie/{id}` response (fields the catalog cares about)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

impl TmdbMovie {
    pub fn into_candidate(self, image_base: &str) -> ImportCandidate {
        let mut candidate = ImportCandidate::new(ContentKind::Movie);
        candidate.tmdb_id = Some(self.id);
        candidate.title = self.title.unwrap_or_default();
        candidate.description = self.overview.unwrap_or_default();
        candidate.release_date = self.release_date.as_deref().and_then(parse_iso_date);
        candidate.poster_url = poster_url(self.poster_path.as_deref(), image_base);
        candidate.runtime = self.runtime.filter(|r| *r > 0);
        candidate.genres = self.genres.into_iter().map(|g| g.name).collect();
        candidate
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSeason {
    pub season_number: i32,
    #[serde(default)]
    pub episode_count: i32,
}

/// `GET /tv/{id}` response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTv {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub number_of_seasons: Option<i32>,
    #[serde(default)]
    pub number_of_episodes: Option<i32>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeason>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

impl TmdbTv {
    pub fn into_candidate(self, image_base: &str) -> ImportCandidate {
        let mut candidate = ImportCandidate::new(ContentKind::TvShow);
        candidate.tmdb_id = Some(self.id);
        candidate.title = self.name.unwrap_or_default();
        candidate.description = self.overview.unwrap_or_default();
        candidate.release_date = self.first_air_date.as_deref().and_then(parse_iso_date);
        candidate.poster_url = poster_url(self.poster_path.as_deref(), image_base);
        candidate.total_seasons = self.number_of_seasons;
        candidate.total_episodes = self.number_of_episodes;
        candidate.episodes_per_season = self
            .seasons
            .iter()
            .map(|s| (s.season_number, s.episode_count))
            .collect();
        candidate.genres = self.genres.into_iter().map(|g| g.name).collect();
        candidate
    }
}

/// `GET /movie/{id}/credits` response; only the crew is inspected
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    pub job: String,
}

impl TmdbCredits {
    /// First crew member credited as Director, if any
    pub fn director(&self) -> Option<String> {
        self.crew
            .iter()
            .find(|member| member.job == "Director")
            .map(|member| member.name.clone())
    }
}

/// `GET /movie/{id}/external_ids` response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

/// Shared shape of `/search/*` and `/discover/*` result items
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl TmdbSearchItem {
    /// Lightweight candidate from a list item
    ///
    /// `genre_names` is the cached id → name map; list items only carry
    /// genre ids, so without the map the genre list stays empty.
    pub fn into_candidate(
        self,
        kind: ContentKind,
        image_base: &str,
        genre_names: Option<&HashMap<i64, String>>,
    ) -> ImportCandidate {
        let mut candidate = ImportCandidate::new(kind);
        candidate.tmdb_id = Some(self.id);
        candidate.title = self.title.or(self.name).unwrap_or_default();
        candidate.description = self.overview.unwrap_or_default();
        candidate.release_date = self
            .release_date
            .or(self.first_air_date)
            .as_deref()
            .and_then(parse_iso_date);
        candidate.poster_url = poster_url(self.poster_path.as_deref(), image_base);
        if let Some(names) = genre_names {
            candidate.genres = self
                .genre_ids
                .iter()
                .filter_map(|id| names.get(id).cloned())
                .collect();
        }
        candidate
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbResultPage {
    #[serde(default)]
    pub results: Vec<TmdbSearchItem>,
}

/// `GET /genre/{movie|tv}/list` response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

    #[test]
    fn parse_iso_date_accepts_tmdb_format() {
        assert_eq!(
            parse_iso_date("1999-03-31"),
            NaiveDate::from_ymd_opt(1999, 3, 31)
        );
        assert_eq!(parse_iso_date(""), None);
        assert_eq!(parse_iso_date("31/03/1999"), None);
    }

    #[test]
    fn movie_detail_maps_to_candidate() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "overview": "A computer hacker learns about the true nature of reality.",
            "release_date": "1999-03-31",
            "poster_path": "/matrix.jpg",
            "runtime": 136,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}]
        }"#;

        let movie: TmdbMovie = serde_json::from_str(json).unwrap();
        let candidate = movie.into_candidate(IMAGE_BASE);

        assert_eq!(candidate.kind, ContentKind::Movie);
        assert_eq!(candidate.tmdb_id, Some(603));
        assert_eq!(candidate.title, "The Matrix");
        assert_eq!(
            candidate.release_date,
            NaiveDate::from_ymd_opt(1999, 3, 31)
        );
        assert_eq!(
            candidate.poster_url,
            "https://image.tmdb.org/t/p/w500/matrix.jpg"
        );
        assert_eq!(candidate.runtime, Some(136));
        assert_eq!(candidate.genres, vec!["Action", "Science Fiction"]);
    }

    #[test]
    fn movie_detail_tolerates_missing_fields() {
        let movie: TmdbMovie = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        let candidate = movie.into_candidate(IMAGE_BASE);

        assert_eq!(candidate.title, "");
        assert_eq!(candidate.release_date, None);
        assert_eq!(candidate.poster_url, "");
        assert_eq!(candidate.runtime, None);
        assert!(candidate.genres.is_empty());
    }

    #[test]
    fn tv_detail_collects_per_season_episode_counts() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "number_of_seasons": 5,
            "number_of_episodes": 62,
            "seasons": [
                {"season_number": 1, "episode_count": 7},
                {"season_number": 2, "episode_count": 13}
            ],
            "genres": [{"id": 18, "name": "Drama"}]
        }"#;

        let tv: TmdbTv = serde_json::from_str(json).unwrap();
        let candidate = tv.into_candidate(IMAGE_BASE);

        assert_eq!(candidate.kind, ContentKind::TvShow);
        assert_eq!(candidate.total_seasons, Some(5));
        assert_eq!(candidate.total_episodes, Some(62));
        assert_eq!(candidate.episodes_per_season.get(&1), Some(&7));
        assert_eq!(candidate.episodes_per_season.get(&2), Some(&13));
        assert_eq!(candidate.genres, vec!["Drama"]);
    }

    #[test]
    fn credits_pick_first_director() {
        let credits = TmdbCredits {
            crew: vec![
                TmdbCrewMember {
                    name: "Jane Editor".to_string(),
                    job: "Editor".to_string(),
                },
                TmdbCrewMember {
                    name: "Lana Wachowski".to_string(),
                    job: "Director".to_string(),
                },
                TmdbCrewMember {
                    name: "Lilly Wachowski".to_string(),
                    job: "Director".to_string(),
                },
            ],
        };
        assert_eq!(credits.director().as_deref(), Some("Lana Wachowski"));

        let empty = TmdbCredits { crew: vec![] };
        assert_eq!(empty.director(), None);
    }

    #[test]
    fn search_item_resolves_genre_ids_through_map() {
        let item = TmdbSearchItem {
            id: 155,
            title: Some("The Dark Knight".to_string()),
            name: None,
            overview: None,
            release_date: Some("2008-07-16".to_string()),
            first_air_date: None,
            poster_path: None,
            genre_ids: vec![28, 80, 999],
        };

        let names = HashMap::from([(28, "Action".to_string()), (80, "Crime".to_string())]);
        let candidate = item.into_candidate(ContentKind::Movie, IMAGE_BASE, Some(&names));

        // Unknown ids are dropped, known ids keep list order
        assert_eq!(candidate.genres, vec!["Action", "Crime"]);
        assert_eq!(candidate.tmdb_id, Some(155));
    }

    #[test]
    fn search_item_prefers_movie_title_then_tv_name() {
        let item = TmdbSearchItem {
            id: 1396,
            title: None,
            name: Some("Breaking Bad".to_string()),
            overview: None,
            release_date: None,
            first_air_date: Some("2008-01-20".to_string()),
            poster_path: None,
            genre_ids: vec![],
        };

        let candidate = item.into_candidate(ContentKind::TvShow, IMAGE_BASE, None);
        assert_eq!(candidate.title, "Breaking Bad");
        assert_eq!(
            candidate.release_date,
            NaiveDate::from_ymd_opt(2008, 1, 20)
        );
    }
}
