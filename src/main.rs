use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moviemate_api::config::Config;
use moviemate_api::db::{
    create_pool, create_redis_client, Cache, CatalogStore, PgCatalogStore, RedisBackend,
};
use moviemate_api::routes::{create_router, AppState};
use moviemate_api::services::providers::{OmdbProvider, ProviderRegistry, TmdbProvider};
use moviemate_api::services::{ImportService, RecommendationEngine, SearchService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moviemate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache_backend, cache_writer) = RedisBackend::connect(redis_client).await?;
    let cache = Cache::new(cache_backend);

    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool));

    let tmdb = TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_base.clone(),
        cache.clone(),
    )?;
    let omdb = OmdbProvider::new(
        config.omdb_api_key.clone(),
        config.omdb_api_url.clone(),
        cache.clone(),
    )?;
    let registry = ProviderRegistry::new(Arc::new(tmdb), Arc::new(omdb));

    let recommendations = Arc::new(RecommendationEngine::new(
        store.clone(),
        registry.clone(),
        cache.clone(),
    ));
    let search = Arc::new(SearchService::new(registry.clone()));
    let import = Arc::new(ImportService::new(
        store.clone(),
        registry,
        recommendations.clone(),
    ));

    let state = AppState {
        store,
        search,
        import,
        recommendations,
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush any queued cache writes before exiting
    cache_writer.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
