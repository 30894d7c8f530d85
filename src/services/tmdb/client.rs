//! TMDb API Client
//!
//! HTTP client for the two lookups the catalog needs: id cross-reference and
//! localized details.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

use super::types::{TmdbExternalIds, TmdbMovieDetails, TmdbTvDetails};
use crate::config::Config;
use crate::models::{Enrichment, MediaKind};

/// Remote lookup failure (distinct from "no mapping", which is `Ok(None)`)
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Network/connection error or timeout
    #[error("Network error: {0}")]
    Network(String),
    /// HTTP error (non-2xx status)
    #[error("HTTP error: {0}")]
    Http(u16),
    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Kind that has no remote endpoint
    #[error("Unsupported kind: {0}")]
    Unsupported(MediaKind),
}

/// Remote metadata service keyed by numeric external id
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Canonical cross-reference id, `Ok(None)` when the service has no mapping
    async fn resolve_id(
        &self,
        kind: MediaKind,
        external_id: &str,
    ) -> Result<Option<String>, ResolutionError>;

    /// Localized descriptive record
    async fn details(&self, kind: MediaKind, external_id: &str) -> Result<Enrichment, ResolutionError>;
}

/// TMDb API Client
pub struct TmdbClient {
    http: Client,
    base_url: String,
    api_key: String,
    language: String,
    image_base: String,
}

fn kind_path(kind: MediaKind) -> Result<&'static str, ResolutionError> {
    match kind {
        MediaKind::Movie => Ok("movie"),
        MediaKind::Series => Ok("tv"),
        MediaKind::Unknown => Err(ResolutionError::Unsupported(kind)),
    }
}

impl TmdbClient {
    /// Create a new TMDb client
    pub fn new(config: &Config, api_key: &str) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(config.tmdb_timeout())
            .user_agent(concat!("m3u-catalog-addon/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        Ok(Self {
            http,
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: config.tmdb_language.clone(),
            image_base: config.tmdb_image_base.clone(),
        })
    }

    /// Make a GET request; `Ok(None)` on 404
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        language: Option<&str>,
    ) -> Result<Option<T>, ResolutionError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("TMDb request: {}", path);

        let mut request = self.http.get(&url).query(&[("api_key", self.api_key.as_str())]);
        if let Some(language) = language {
            request = request.query(&[("language", language)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolutionError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ResolutionError::Http(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ResolutionError::Network(e.without_url().to_string()))?;

        serde_json::from_str(&text).map(Some).map_err(|e| {
            error!("Failed to parse TMDb response for '{}': {}", path, e);
            debug!("Response text: {}", text.chars().take(500).collect::<String>());
            ResolutionError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn resolve_id(
        &self,
        kind: MediaKind,
        external_id: &str,
    ) -> Result<Option<String>, ResolutionError> {
        let path = format!("{}/{}/external_ids", kind_path(kind)?, external_id);
        let ids: Option<TmdbExternalIds> = self.get(&path, None).await?;
        Ok(ids.and_then(|ids| ids.imdb()))
    }

    async fn details(&self, kind: MediaKind, external_id: &str) -> Result<Enrichment, ResolutionError> {
        let path = format!("{}/{}", kind_path(kind)?, external_id);
        let language = Some(self.language.as_str());

        let enrichment = match kind {
            MediaKind::Movie => self
                .get::<TmdbMovieDetails>(&path, language)
                .await?
                .map(|d| d.into_enrichment(&self.image_base)),
            _ => self
                .get::<TmdbTvDetails>(&path, language)
                .await?
                .map(|d| d.into_enrichment(&self.image_base)),
        };

        Ok(enrichment.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::playlist_fetcher::tests::serve;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;

    async fn fake_tmdb() -> String {
        let app = Router::new()
            .route(
                "/3/movie/:id/external_ids",
                get(|Path(id): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    if q.get("api_key").map(String::as_str) != Some("secret") {
                        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
                    }
                    match id.as_str() {
                        "603" => (StatusCode::OK, Json(serde_json::json!({ "imdb_id": "tt0133093" }))),
                        "1" => (StatusCode::OK, Json(serde_json::json!({ "imdb_id": null }))),
                        _ => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "status_code": 34 }))),
                    }
                }),
            )
            .route("/3/tv/:id/external_ids", get(|| async { "not json" }))
            .route(
                "/3/movie/:id",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({
                        "overview": format!("overview in {}", q.get("language").cloned().unwrap_or_default()),
                        "poster_path": "/matrix.jpg",
                        "release_date": "1999-03-30",
                        "runtime": 136,
                        "vote_average": 8.2
                    }))
                }),
            )
            .route(
                "/3/tv/:id",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        serve(app).await
    }

    async fn client() -> TmdbClient {
        let base = fake_tmdb().await;
        let mut config = Config::for_tests("http://unused");
        config.tmdb_base_url = format!("{}/3/", base);
        TmdbClient::new(&config, "secret").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_movie() {
        let client = client().await;
        let id = client.resolve_id(MediaKind::Movie, "603").await.unwrap();
        assert_eq!(id.as_deref(), Some("tt0133093"));
    }

    #[tokio::test]
    async fn test_resolve_without_mapping() {
        let client = client().await;
        assert_eq!(client.resolve_id(MediaKind::Movie, "1").await.unwrap(), None);
        assert_eq!(client.resolve_id(MediaKind::Movie, "999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_malformed_json_is_error() {
        let client = client().await;
        let err = client.resolve_id(MediaKind::Series, "1399").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_kind_is_error() {
        let client = client().await;
        let err = client.resolve_id(MediaKind::Unknown, "1").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Unsupported(MediaKind::Unknown)));
    }

    #[tokio::test]
    async fn test_details_are_localized() {
        let client = client().await;
        let details = client.details(MediaKind::Movie, "603").await.unwrap();
        assert_eq!(details.description.as_deref(), Some("overview in en-US"));
        assert_eq!(details.year, Some(1999));
        assert!(details.poster.unwrap().ends_with("/matrix.jpg"));
    }

    #[tokio::test]
    async fn test_details_http_error() {
        let client = client().await;
        let err = client.details(MediaKind::Series, "1399").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Http(500)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let mut config = Config::for_tests("http://unused");
        config.tmdb_base_url = "http://127.0.0.1:9/3".to_string();
        let client = TmdbClient::new(&config, "secret").unwrap();
        let err = client.resolve_id(MediaKind::Movie, "603").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Network(_)));
    }
}
