//! HTTP handlers for the catalog surface

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{
    CanonicalContent, CatalogStatistics, ContentKind, ContentPatch, ImportCandidate, NewContent,
    ProviderId, WatchStatus,
};
use crate::services::providers::ProviderKey;
use crate::services::DEFAULT_POOL_SIZE;

use super::AppState;

fn default_kind() -> ContentKind {
    ContentKind::Movie
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub provider: ProviderKey,
    pub q: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ContentKind,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<ImportCandidate>>> {
    let hits = state
        .search
        .search(params.provider, &params.q, params.kind)
        .await?;
    Ok(Json(hits))
}

#[derive(Deserialize)]
pub struct ImportRequest {
    pub provider_id: ProviderId,
    #[serde(default = "default_kind")]
    pub content_type: ContentKind,
    #[serde(default)]
    pub status: Option<WatchStatus>,
}

pub async fn import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> AppResult<Response> {
    let outcome = state
        .import
        .import(request.provider_id, request.content_type, request.status)
        .await?;

    if outcome.already_exists {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Content already exists",
                "data": outcome.content,
            })),
        )
            .into_response());
    }
    Ok((StatusCode::CREATED, Json(outcome.content)).into_response())
}

#[derive(Deserialize)]
pub struct RecommendationParams {
    pub pool_size: Option<usize>,
}

pub async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Response> {
    let pool_size = params.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
    if pool_size == 0 {
        return Err(AppError::InvalidInput(
            "pool_size must be positive".to_string(),
        ));
    }
    let pool = state.recommendations.get_recommendations(pool_size).await?;
    Ok(Json(pool).into_response())
}

pub async fn statistics(State(state): State<AppState>) -> AppResult<Json<CatalogStatistics>> {
    Ok(Json(state.store.statistics().await?))
}

#[derive(Deserialize)]
pub struct CreateContentRequest {
    pub title: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ContentKind,
    #[serde(default)]
    pub status: Option<WatchStatus>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub total_seasons: Option<i32>,
    #[serde(default)]
    pub total_episodes: Option<i32>,
}

pub async fn create_content(
    State(state): State<AppState>,
    Json(request): Json<CreateContentRequest>,
) -> AppResult<(StatusCode, Json<CanonicalContent>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let mut genre_ids = Vec::new();
    for name in &request.genres {
        genre_ids.push(state.store.get_or_create_genre(name).await?.id);
    }

    let is_tv = request.kind == ContentKind::TvShow;
    let content = state
        .store
        .create_content(NewContent {
            title: request.title,
            director: request.director,
            description: request.description,
            release_date: request.release_date,
            poster_url: request.poster_url,
            runtime: request.runtime,
            content_type: request.kind,
            status: request.status.unwrap_or_default(),
            tmdb_id: None,
            imdb_id: None,
            genre_ids,
            total_seasons: is_tv.then(|| request.total_seasons.unwrap_or(1)),
            total_episodes: is_tv.then(|| request.total_episodes.unwrap_or(0)),
            episodes_per_season: Default::default(),
        })
        .await?;

    state.recommendations.invalidate_pools().await;
    Ok((StatusCode::CREATED, Json(content)))
}

pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ContentPatch>,
) -> AppResult<Json<CanonicalContent>> {
    let content = state.store.update_content(id, patch).await?;
    state.recommendations.invalidate_pools().await;
    Ok(Json(content))
}
