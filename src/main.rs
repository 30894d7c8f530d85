mod config;
mod error;
mod models;
mod routes;
mod services;

use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{
    catalog_store::CatalogStore,
    playlist_fetcher::HttpPlaylistSource,
    query::GenreMarker,
    resolver::IdResolver,
    stream_probe::StreamProbe,
    tmdb::{MetadataProvider, TmdbClient},
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub store: CatalogStore,
    /// Present when direct streams are validated before being served
    pub probe: Option<StreamProbe>,
    pub marker: GenreMarker,
    pub start_time: Instant,
}

/// Add-on protocol routes plus operational endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/live", get(routes::health::live))
        // Add-on protocol
        .route("/manifest.json", get(routes::addon::manifest))
        .route("/catalog/:kind/:id", get(routes::addon::catalog))
        .route(
            "/catalog/:kind/:id/:extra",
            get(routes::addon::catalog_with_extra),
        )
        .route("/meta/:kind/:id", get(routes::addon::meta))
        .route("/stream/:kind/:id", get(routes::addon::stream))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "m3u_catalog_addon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    tracing::info!("Starting {} v{}", config.addon_name, env!("CARGO_PKG_VERSION"));

    let source = HttpPlaylistSource::new(&config).context("failed to build playlist client")?;

    let provider: Option<Arc<dyn MetadataProvider>> = match &config.tmdb_key {
        Some(key) => {
            let client: Arc<dyn MetadataProvider> =
                Arc::new(TmdbClient::new(&config, key).context("failed to build TMDb client")?);
            tracing::info!("TMDb resolution enabled ({})", config.tmdb_language);
            Some(client)
        }
        None => {
            tracing::warn!("TMDB_KEY not set, serving playlist-derived ids");
            None
        }
    };
    let resolver = IdResolver::new(provider, &config);
    let store = CatalogStore::new(Arc::new(source), resolver, config.cache_ttl());

    let probe = if config.validate_streams {
        Some(StreamProbe::new(&config).context("failed to build stream probe client")?)
    } else {
        None
    };

    let state = Arc::new(AppState {
        marker: GenreMarker::new(&config.deprioritized_genre_prefix),
        store,
        probe,
        config,
        start_time: Instant::now(),
    });

    // Warm the catalog in the background; queries retry on failure
    let warmup = state.clone();
    tokio::spawn(async move {
        if warmup.store.ensure_fresh(false).await.is_ok() {
            tracing::info!("Initial catalog load completed");
        }
    });

    let app = build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}/manifest.json", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
