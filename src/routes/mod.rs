pub mod content;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::CatalogStore;
use crate::middleware::request_id_middleware;
use crate::services::{ImportService, RecommendationEngine, SearchService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub search: Arc<SearchService>,
    pub import: Arc<ImportService>,
    pub recommendations: Arc<RecommendationEngine>,
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/content/search", get(content::search))
        .route("/content/import", post(content::import))
        .route("/content/recommendations", get(content::recommendations))
        .route("/content/statistics", get(content::statistics))
        .route("/content", post(content::create_content))
        .route("/content/:id", patch(content::update_content))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
