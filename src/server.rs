/// Server setup and initialization
///
/// Wires together the database, language registry, cache, event dispatcher
/// and HTTP routes into the Axum application.

use crate::{
    api::{auth::UserStore, create_api_routes, AppState},
    catalog::{CatalogStorage, LanguageRegistry},
    config::Config,
    db::DatabaseManager,
    events::{
        activity::ActivityLog,
        cache::{CacheStore, MemoryCache},
        EventDispatcher,
    },
    history::HistoryStore,
    thumbnails::Thumbnailer,
    views::create_view_routes,
    workouts::WorkoutStore,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Open the database and build every shared component
pub async fn build_state(config: Config) -> Result<AppState> {
    let database = DatabaseManager::connect(&config.database, &config.default_language)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open catalog database: {}", e))?;
    let pool = database.pool();
    let storage = CatalogStorage::new(pool.clone());

    tracing::info!("🌍 Loading languages");
    let languages = Arc::new(LanguageRegistry::new(storage.clone(), config.default_language.clone()));
    languages.reload().await?;

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let activity = ActivityLog::new(pool.clone());
    let events = EventDispatcher::new(Arc::clone(&cache), activity.clone(), Arc::clone(&languages));
    let thumbnailer = Arc::new(Thumbnailer::new(
        config.media.media_url.clone(),
        config.media.thumbnail_aliases.clone(),
    ));

    Ok(AppState {
        workouts: WorkoutStore::new(storage.clone(), Arc::clone(&cache)),
        history: HistoryStore::new(pool.clone()),
        users: UserStore::new(pool),
        config: Arc::new(config),
        storage,
        languages,
        events,
        cache,
        thumbnailer,
        activity,
    })
}

/// Router with every endpoint bound to `state`
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_api_routes())
        .merge(create_view_routes())
        .with_state(state)
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    let state = build_state(config).await?;
    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = create_router(state);
    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting exercise catalog server...");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(config).await?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Initialize the tracing subscriber used by every command
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

async fn health_check() -> &'static str {
    "ok"
}
