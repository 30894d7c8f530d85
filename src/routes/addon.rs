use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::models::{
    CatalogDescriptor, CatalogExtra, CatalogResponse, ExtraField, Manifest, MediaKind, MetaResponse,
    StreamsResponse, MOVIE_CATALOG_ID, SERIES_CATALOG_ID,
};
use crate::services::catalog_store::Snapshot;
use crate::services::query::{find_meta, find_streams, list_catalog, CatalogQuery};
use crate::AppState;

/// Path segments arrive as `{value}.json`
fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

fn catalog_kind(catalog_id: &str) -> Option<MediaKind> {
    match catalog_id {
        MOVIE_CATALOG_ID => Some(MediaKind::Movie),
        SERIES_CATALOG_ID => Some(MediaKind::Series),
        _ => None,
    }
}

/// Snapshot to serve; after a failed refresh this is the last good one.
/// `None` only when nothing could ever be loaded (logged by the store)
async fn snapshot(state: &AppState, force: bool) -> Option<Arc<Snapshot>> {
    state.store.ensure_fresh(force).await.ok()
}

fn catalog_descriptor(kind: MediaKind, id: &str, name: &str, genres: &[String]) -> CatalogDescriptor {
    CatalogDescriptor {
        kind,
        id: id.to_string(),
        name: name.to_string(),
        extra: vec![
            ExtraField::with_options("genre", genres.to_vec()),
            ExtraField::optional("skip"),
            ExtraField::optional("refresh"),
        ],
    }
}

/// GET /manifest.json
pub async fn manifest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Genre options come from the catalog; an unavailable playlist must not
    // break installation
    let snapshot = snapshot(&state, false).await.unwrap_or_default();
    let name = &state.config.addon_name;

    Json(Manifest {
        id: "community.m3u.catalog".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: name.clone(),
        description: "Movies and series from a personal M3U playlist".to_string(),
        resources: vec!["catalog".to_string(), "meta".to_string(), "stream".to_string()],
        types: vec![MediaKind::Movie, MediaKind::Series],
        id_prefixes: vec!["tt".to_string(), "m3u".to_string()],
        catalogs: vec![
            catalog_descriptor(
                MediaKind::Movie,
                MOVIE_CATALOG_ID,
                &format!("{} Movies", name),
                snapshot.genres(MediaKind::Movie),
            ),
            catalog_descriptor(
                MediaKind::Series,
                SERIES_CATALOG_ID,
                &format!("{} Series", name),
                snapshot.genres(MediaKind::Series),
            ),
        ],
    })
}

async fn catalog_page(state: &AppState, kind: &str, catalog_id: &str, extra: CatalogExtra) -> CatalogResponse {
    let empty = CatalogResponse { metas: Vec::new() };

    let Some(kind) = MediaKind::from_request(kind) else {
        return empty;
    };
    if catalog_kind(catalog_id) != Some(kind) {
        tracing::debug!("Unknown catalog {}/{}", kind, catalog_id);
        return empty;
    }
    let Some(snapshot) = snapshot(state, extra.refresh).await else {
        return empty;
    };

    let query = CatalogQuery {
        genre: extra.genre.as_deref(),
        skip: extra.skip,
        limit: state.config.catalog_page_size,
    };
    let metas = list_catalog(&snapshot, kind, &query, &state.marker);
    tracing::debug!(
        "Catalog {} (genre={:?}, skip={}): {} items",
        catalog_id,
        extra.genre,
        extra.skip,
        metas.len()
    );
    CatalogResponse { metas }
}

/// GET /catalog/:kind/:id.json
pub async fn catalog(
    State(state): State<Arc<AppState>>,
    Path((kind, file)): Path<(String, String)>,
) -> impl IntoResponse {
    Json(catalog_page(&state, &kind, strip_json(&file), CatalogExtra::default()).await)
}

/// GET /catalog/:kind/:id/:extra.json
pub async fn catalog_with_extra(
    State(state): State<Arc<AppState>>,
    Path((kind, id, extra)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let extra = CatalogExtra::parse(strip_json(&extra));
    Json(catalog_page(&state, &kind, &id, extra).await)
}

/// GET /meta/:kind/:id.json
pub async fn meta(
    State(state): State<Arc<AppState>>,
    Path((kind, file)): Path<(String, String)>,
) -> impl IntoResponse {
    let id = strip_json(&file);
    let meta = match (MediaKind::from_request(&kind), snapshot(&state, false).await) {
        (Some(kind), Some(snapshot)) => find_meta(&snapshot, kind, id),
        _ => None,
    };

    match meta {
        Some(meta) => (StatusCode::OK, Json(MetaResponse { meta: Some(meta) })),
        None => {
            tracing::debug!("Meta not found: {}/{}", kind, id);
            (StatusCode::NOT_FOUND, Json(MetaResponse { meta: None }))
        }
    }
}

/// GET /stream/:kind/:id.json
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Path((kind, file)): Path<(String, String)>,
) -> impl IntoResponse {
    let id = strip_json(&file);
    let (Some(kind), Some(snapshot)) = (MediaKind::from_request(&kind), snapshot(&state, false).await) else {
        return Json(StreamsResponse { streams: Vec::new() });
    };

    let mut streams = find_streams(&snapshot, kind, id, state.config.stream_mode, &state.config.addon_name);
    if let Some(probe) = &state.probe {
        streams = probe.retain_available(streams).await;
    }
    Json(StreamsResponse { streams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StreamMode};
    use crate::services::catalog_store::tests::{store_with, FakeSource, PLAYLIST};
    use crate::services::query::GenreMarker;
    use crate::build_router;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        Router,
    };
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    fn app_with(source: Arc<FakeSource>, configure: impl FnOnce(&mut Config)) -> Router {
        app_with_ttl(source, Duration::from_secs(120), configure)
    }

    fn app_with_ttl(source: Arc<FakeSource>, ttl: Duration, configure: impl FnOnce(&mut Config)) -> Router {
        let mut config = Config::for_tests("http://unused");
        configure(&mut config);
        let state = AppState {
            marker: GenreMarker::new(&config.deprioritized_genre_prefix),
            store: store_with(source, ttl),
            probe: None,
            config,
            start_time: Instant::now(),
        };
        build_router(Arc::new(state))
    }

    fn app() -> Router {
        app_with(Arc::new(FakeSource::new(PLAYLIST)), |_| {})
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_manifest() {
        let (status, body) = get_json(app(), "/manifest.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["idPrefixes"], serde_json::json!(["tt", "m3u"]));
        assert_eq!(body["catalogs"][0]["id"], "m3u-movies");
        assert_eq!(body["catalogs"][0]["type"], "movie");
        assert_eq!(body["catalogs"][0]["extra"][0]["name"], "genre");
        assert_eq!(body["catalogs"][0]["extra"][0]["options"], serde_json::json!(["Action", "Sci-Fi"]));
        assert_eq!(body["catalogs"][1]["id"], "m3u-series");
    }

    #[tokio::test]
    async fn test_movie_catalog() {
        let (status, body) = get_json(app(), "/catalog/movie/m3u-movies.json").await;
        assert_eq!(status, StatusCode::OK);
        let metas = body["metas"].as_array().unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0]["id"], "tt0133093");
        assert_eq!(metas[0]["name"], "The Matrix");
        assert_eq!(metas[0]["type"], "movie");
    }

    #[tokio::test]
    async fn test_catalog_extra_genre_filter() {
        let (_, body) = get_json(app(), "/catalog/movie/m3u-movies/genre=Sci-Fi.json").await;
        assert_eq!(body["metas"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(app(), "/catalog/movie/m3u-movies/genre=Drama.json").await;
        assert!(body["metas"].as_array().unwrap().is_empty());

        let (_, body) = get_json(app(), "/catalog/series/m3u-series/genre=Drama&skip=0.json").await;
        assert_eq!(body["metas"][0]["id"], "tt0944947");
    }

    #[tokio::test]
    async fn test_catalog_refresh_extra_forces_reload() {
        let source = Arc::new(FakeSource::new(PLAYLIST));
        let app = app_with(source.clone(), |_| {});

        get_json(app.clone(), "/catalog/movie/m3u-movies.json").await;
        get_json(app.clone(), "/catalog/movie/m3u-movies.json").await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        get_json(app, "/catalog/movie/m3u-movies/refresh=1.json").await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_catalog_is_empty() {
        let (status, body) = get_json(app(), "/catalog/movie/m3u-series.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["metas"].as_array().unwrap().is_empty());

        let (_, body) = get_json(app(), "/catalog/channel/m3u-movies.json").await;
        assert!(body["metas"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_empty_catalog() {
        let source = Arc::new(FakeSource::new(PLAYLIST));
        source.fail_with(404);
        let (status, body) = get_json(app_with(source, |_| {}), "/catalog/movie/m3u-movies.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "metas": [] }));
    }

    #[tokio::test]
    async fn test_source_outage_after_ttl_serves_last_catalog() {
        let source = Arc::new(FakeSource::new(PLAYLIST));
        let app = app_with_ttl(source.clone(), Duration::from_millis(20), |_| {});

        let (_, body) = get_json(app.clone(), "/catalog/movie/m3u-movies.json").await;
        assert_eq!(body["metas"][0]["id"], "tt0133093");

        tokio::time::sleep(Duration::from_millis(40)).await;
        source.fail_with(503);

        let (status, body) = get_json(app.clone(), "/catalog/movie/m3u-movies.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metas"][0]["id"], "tt0133093");

        let (status, body) = get_json(app.clone(), "/meta/series/tt0944947.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["videos"].as_array().unwrap().len(), 2);

        let (_, body) = get_json(app, "/stream/movie/tt0133093.json").await;
        assert_eq!(body["streams"][0]["url"], "http://media/matrix.mp4");
        assert!(source.fetches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_series_meta_lists_episodes() {
        let (status, body) = get_json(app(), "/meta/series/tt0944947.json").await;
        assert_eq!(status, StatusCode::OK);
        let videos = body["meta"]["videos"].as_array().unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0]["title"], "S01E01");
        assert_eq!(videos[1]["title"], "S01E02");
        assert_eq!(videos[1]["id"], "tt0944947:1:2");
    }

    #[tokio::test]
    async fn test_meta_not_found() {
        let (status, body) = get_json(app(), "/meta/movie/tt0000001.json").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "meta": null }));
    }

    #[tokio::test]
    async fn test_streams() {
        let (_, body) = get_json(app(), "/stream/movie/tt0133093.json").await;
        assert_eq!(body["streams"][0]["url"], "http://media/matrix.mp4");
        assert!(body["streams"][0].get("behaviorHints").is_none());

        let app = app_with(Arc::new(FakeSource::new(PLAYLIST)), |c| c.stream_mode = StreamMode::Autoplay);
        let (_, body) = get_json(app, "/stream/series/tt0944947:1:1.json").await;
        assert_eq!(body["streams"][0]["url"], "http://media/show-1-1.mkv");
        assert_eq!(body["streams"][0]["behaviorHints"]["bingeGroup"], "m3u-tt0944947");

        let (_, body) = get_json(app_with(Arc::new(FakeSource::new(PLAYLIST)), |_| {}), "/stream/series/tt0944947:2:1.json").await;
        assert_eq!(body, serde_json::json!({ "streams": [] }));
    }

    #[test]
    fn test_strip_json() {
        assert_eq!(strip_json("m3u-movies.json"), "m3u-movies");
        assert_eq!(strip_json("tt1:1:2.json"), "tt1:1:2");
        assert_eq!(strip_json("plain"), "plain");
    }
}
