//! Catalog persistence behind the [`CatalogStore`] trait
//!
//! The trait is the seam the services are written against; production code
//! talks to Postgres through [`PgCatalogStore`], tests substitute a mock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{
    CanonicalContent, CatalogStatistics, ContentKind, ContentPatch, Genre, GenreTagged,
    NewContent, RatingSignal, WatchStatus,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<CanonicalContent>>;
    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<CanonicalContent>>;
    /// IMDB ids compare case-insensitively
    async fn find_by_imdb_id(&self, imdb_id: &str) -> AppResult<Option<CanonicalContent>>;
    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre>;
    async fn create_content(&self, new: NewContent) -> AppResult<CanonicalContent>;
    async fn update_content(&self, id: i64, patch: ContentPatch) -> AppResult<CanonicalContent>;
    /// All ratings, oldest first, each with its content's genres
    async fn rating_signals(&self) -> AppResult<Vec<RatingSignal>>;
    /// Ids of content with at least one completed progress row
    async fn completed_progress_ids(&self) -> AppResult<Vec<i64>>;
    /// Content appearing in the watch history, with genres
    async fn watch_history_signals(&self) -> AppResult<Vec<GenreTagged>>;
    /// Content whose status is completed, with genres
    async fn completed_content_signals(&self) -> AppResult<Vec<GenreTagged>>;
    /// Best-rated catalog records outside the excluded set; unrated records
    /// sort after rated ones, newest first within a tier
    async fn top_rated_excluding(
        &self,
        excluded: Vec<i64>,
        limit: i64,
    ) -> AppResult<Vec<CanonicalContent>>;
    /// Catalog records tagged with any of the given genres, outside the
    /// excluded set, best-rated first
    async fn by_genres_excluding(
        &self,
        genres: Vec<String>,
        excluded: Vec<i64>,
        limit: i64,
    ) -> AppResult<Vec<CanonicalContent>>;
    /// Every TMDB id already present in the catalog
    async fn known_tmdb_ids(&self) -> AppResult<HashSet<i64>>;
    async fn statistics(&self) -> AppResult<CatalogStatistics>;
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: i64,
    title: String,
    director: String,
    description: String,
    release_date: Option<NaiveDate>,
    poster_url: String,
    runtime: Option<i32>,
    content_type: String,
    status: String,
    tmdb_id: Option<i64>,
    imdb_id: Option<String>,
    genres: Vec<String>,
    total_seasons: Option<i32>,
    total_episodes: Option<i32>,
    episodes_per_season: Option<Json<HashMap<i32, i32>>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for CanonicalContent {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let content_type = ContentKind::parse(&row.content_type).ok_or_else(|| {
            AppError::Internal(format!("unknown content type in row: {}", row.content_type))
        })?;
        let status = WatchStatus::parse(&row.status)
            .ok_or_else(|| AppError::Internal(format!("unknown status in row: {}", row.status)))?;
        Ok(CanonicalContent {
            id: row.id,
            title: row.title,
            director: row.director,
            description: row.description,
            release_date: row.release_date,
            poster_url: row.poster_url,
            runtime: row.runtime,
            content_type,
            status,
            tmdb_id: row.tmdb_id,
            imdb_id: row.imdb_id,
            genres: row.genres,
            total_seasons: row.total_seasons,
            total_episodes: row.total_episodes,
            episodes_per_season: row.episodes_per_season.map(|j| j.0).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Base projection: one row per content with genres aggregated in the
/// order they were attached
const CONTENT_SELECT: &str = r#"
    SELECT c.id, c.title, c.director, c.description, c.release_date, c.poster_url,
           c.runtime, c.content_type, c.status, c.tmdb_id, c.imdb_id,
           c.total_seasons, c.total_episodes, c.episodes_per_season,
           c.created_at, c.updated_at,
           COALESCE(
               array_agg(g.name ORDER BY cg.position) FILTER (WHERE g.name IS NOT NULL),
               '{}'
           ) AS genres
    FROM contents c
    LEFT JOIN content_genres cg ON cg.content_id = c.id
    LEFT JOIN genres g ON g.id = cg.genre_id
"#;

/// Average rating as a correlated subquery so the ratings join never
/// multiplies the genre aggregation
const AVG_RATING_ORDER: &str = r#"
    ORDER BY (SELECT AVG(r.rating)::float8 FROM ratings r WHERE r.content_id = c.id)
             DESC NULLS LAST,
             c.created_at DESC
"#;

fn rows_to_content(rows: Vec<ContentRow>) -> AppResult<Vec<CanonicalContent>> {
    rows.into_iter().map(CanonicalContent::try_from).collect()
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<CanonicalContent>> {
        let sql = format!("{CONTENT_SELECT} WHERE c.id = $1 GROUP BY c.id");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CanonicalContent::try_from).transpose()
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<CanonicalContent>> {
        let sql = format!("{CONTENT_SELECT} WHERE c.tmdb_id = $1 GROUP BY c.id");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CanonicalContent::try_from).transpose()
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> AppResult<Option<CanonicalContent>> {
        let sql = format!("{CONTENT_SELECT} WHERE LOWER(c.imdb_id) = LOWER($1) GROUP BY c.id");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(imdb_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CanonicalContent::try_from).transpose()
    }

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre> {
        // The no-op update makes RETURNING yield the row on conflict too
        let (id, name) = sqlx::query_as::<_, (i64, String)>(
            r#"
            INSERT INTO genres (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(Genre { id, name })
    }

    async fn create_content(&self, new: NewContent) -> AppResult<CanonicalContent> {
        let mut tx = self.pool.begin().await?;

        let episodes = if new.episodes_per_season.is_empty() {
            None
        } else {
            Some(Json(new.episodes_per_season.clone()))
        };

        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO contents
                (title, director, description, release_date, poster_url, runtime,
                 content_type, status, tmdb_id, imdb_id,
                 total_seasons, total_episodes, episodes_per_season)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&new.title)
        .bind(&new.director)
        .bind(&new.description)
        .bind(new.release_date)
        .bind(&new.poster_url)
        .bind(new.runtime)
        .bind(new.content_type.as_str())
        .bind(new.status.as_str())
        .bind(new.tmdb_id)
        .bind(&new.imdb_id)
        .bind(new.total_seasons)
        .bind(new.total_episodes)
        .bind(episodes)
        .fetch_one(&mut *tx)
        .await?;

        for (position, genre_id) in new.genre_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO content_genres (content_id, genre_id, position)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(genre_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("inserted content row vanished".to_string()))
    }

    async fn update_content(&self, id: i64, patch: ContentPatch) -> AppResult<CanonicalContent> {
        let result = sqlx::query(
            r#"
            UPDATE contents SET
                title = COALESCE($2, title),
                director = COALESCE($3, director),
                description = COALESCE($4, description),
                poster_url = COALESCE($5, poster_url),
                runtime = COALESCE($6, runtime),
                status = COALESCE($7, status),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.director)
        .bind(&patch.description)
        .bind(&patch.poster_url)
        .bind(patch.runtime)
        .bind(patch.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("content {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content {} not found", id)))
    }

    async fn rating_signals(&self) -> AppResult<Vec<RatingSignal>> {
        let rows = sqlx::query_as::<_, (i64, i32, Vec<String>)>(
            r#"
            SELECT r.content_id, r.rating,
                   COALESCE(
                       array_agg(g.name ORDER BY cg.position) FILTER (WHERE g.name IS NOT NULL),
                       '{}'
                   ) AS genres
            FROM ratings r
            LEFT JOIN content_genres cg ON cg.content_id = r.content_id
            LEFT JOIN genres g ON g.id = cg.genre_id
            GROUP BY r.id, r.content_id, r.rating
            ORDER BY r.rated_at ASC, r.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(content_id, value, genres)| RatingSignal {
                content_id,
                value,
                genres,
            })
            .collect())
    }

    async fn completed_progress_ids(&self) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT content_id FROM watch_progress
            WHERE completed
            ORDER BY content_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn watch_history_signals(&self) -> AppResult<Vec<GenreTagged>> {
        let rows = sqlx::query_as::<_, (i64, Vec<String>)>(
            r#"
            SELECT c.id,
                   COALESCE(
                       array_agg(g.name ORDER BY cg.position) FILTER (WHERE g.name IS NOT NULL),
                       '{}'
                   ) AS genres
            FROM contents c
            LEFT JOIN content_genres cg ON cg.content_id = c.id
            LEFT JOIN genres g ON g.id = cg.genre_id
            WHERE EXISTS (SELECT 1 FROM watch_history h WHERE h.content_id = c.id)
            GROUP BY c.id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(content_id, genres)| GenreTagged { content_id, genres })
            .collect())
    }

    async fn completed_content_signals(&self) -> AppResult<Vec<GenreTagged>> {
        let rows = sqlx::query_as::<_, (i64, Vec<String>)>(
            r#"
            SELECT c.id,
                   COALESCE(
                       array_agg(g.name ORDER BY cg.position) FILTER (WHERE g.name IS NOT NULL),
                       '{}'
                   ) AS genres
            FROM contents c
            LEFT JOIN content_genres cg ON cg.content_id = c.id
            LEFT JOIN genres g ON g.id = cg.genre_id
            WHERE c.status = 'completed'
            GROUP BY c.id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(content_id, genres)| GenreTagged { content_id, genres })
            .collect())
    }

    async fn top_rated_excluding(
        &self,
        excluded: Vec<i64>,
        limit: i64,
    ) -> AppResult<Vec<CanonicalContent>> {
        let sql = format!(
            "{CONTENT_SELECT} WHERE NOT (c.id = ANY($1)) GROUP BY c.id {AVG_RATING_ORDER} LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(&excluded)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_to_content(rows)
    }

    async fn by_genres_excluding(
        &self,
        genres: Vec<String>,
        excluded: Vec<i64>,
        limit: i64,
    ) -> AppResult<Vec<CanonicalContent>> {
        let sql = format!(
            r#"{CONTENT_SELECT}
            WHERE NOT (c.id = ANY($2))
              AND EXISTS (
                  SELECT 1 FROM content_genres cg2
                  JOIN genres g2 ON g2.id = cg2.genre_id
                  WHERE cg2.content_id = c.id AND g2.name = ANY($1)
              )
            GROUP BY c.id {AVG_RATING_ORDER} LIMIT $3"#
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(&genres)
            .bind(&excluded)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_to_content(rows)
    }

    async fn known_tmdb_ids(&self) -> AppResult<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT tmdb_id FROM contents WHERE tmdb_id IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn statistics(&self) -> AppResult<CatalogStatistics> {
        let (total, movies, tv_shows) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE content_type = 'movie'),
                   COUNT(*) FILTER (WHERE content_type = 'tv_show')
            FROM contents
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let status_rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM contents GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut status_counts: HashMap<String, i64> = WatchStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for (status, count) in status_rows {
            status_counts.insert(status, count);
        }

        let average_rating = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(rating)::float8, 0) FROM ratings",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogStatistics {
            total,
            movies,
            tv_shows,
            status_counts,
            average_rating: (average_rating * 100.0).round() / 100.0,
        })
    }
}
