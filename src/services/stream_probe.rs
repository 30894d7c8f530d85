//! Direct stream existence check
//!
//! HEAD first; hosts that reject HEAD get a one-byte ranged GET. Any failure
//! or timeout means "unavailable", never an error.

use reqwest::{header, redirect, Client, StatusCode};

use crate::config::Config;
use crate::models::Stream;
use crate::services::metrics::STREAM_PROBES;

pub struct StreamProbe {
    http: Client,
}

/// Statuses that mean the host does not accept HEAD for this resource
fn head_rejected(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::NOT_IMPLEMENTED
            | StatusCode::FORBIDDEN
            | StatusCode::BAD_REQUEST
    )
}

impl StreamProbe {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.stream_probe_timeout())
            .redirect(redirect::Policy::limited(5))
            .build()?;
        Ok(Self { http })
    }

    /// Whether the URL currently answers with a success status
    pub async fn is_available(&self, url: &str) -> bool {
        let available = match self.http.head(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) if head_rejected(response.status()) => {
                tracing::debug!("HEAD rejected ({}), retrying with ranged GET", response.status());
                self.ranged_get(url).await
            }
            Ok(response) => {
                tracing::warn!("Stream probe got HTTP {} for {}", response.status(), url);
                false
            }
            Err(e) => {
                tracing::warn!("Stream probe failed for {}: {}", url, e);
                false
            }
        };

        let outcome = if available { "available" } else { "unavailable" };
        STREAM_PROBES.with_label_values(&[outcome]).inc();
        available
    }

    async fn ranged_get(&self, url: &str) -> bool {
        match self
            .http
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                status.is_success() || status == StatusCode::PARTIAL_CONTENT
            }
            Err(e) => {
                tracing::warn!("Ranged GET probe failed for {}: {}", url, e);
                false
            }
        }
    }

    /// Keep only the streams whose URL passes the probe
    pub async fn retain_available(&self, streams: Vec<Stream>) -> Vec<Stream> {
        let mut kept = Vec::with_capacity(streams.len());
        for stream in streams {
            if self.is_available(&stream.url).await {
                kept.push(stream);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::playlist_fetcher::tests::serve;
    use axum::{
        http::{HeaderMap, Method, StatusCode},
        routing::{any, get},
        Router,
    };
    use std::time::Duration;

    async fn media_host() -> String {
        let app = Router::new()
            .route("/ok.mp4", get(|| async { "data" }))
            .route(
                "/no-head.mp4",
                any(|method: Method, headers: HeaderMap| async move {
                    if method == Method::HEAD {
                        return StatusCode::METHOD_NOT_ALLOWED;
                    }
                    if headers.get("range").is_some() {
                        StatusCode::PARTIAL_CONTENT
                    } else {
                        StatusCode::OK
                    }
                }),
            )
            .route("/gone.mp4", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow.mp4",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            );
        serve(app).await
    }

    fn probe() -> StreamProbe {
        StreamProbe::new(&Config::for_tests("http://unused")).unwrap()
    }

    #[tokio::test]
    async fn test_head_success() {
        let base = media_host().await;
        assert!(probe().is_available(&format!("{}/ok.mp4", base)).await);
    }

    #[tokio::test]
    async fn test_falls_back_to_ranged_get() {
        let base = media_host().await;
        assert!(probe().is_available(&format!("{}/no-head.mp4", base)).await);
    }

    #[tokio::test]
    async fn test_missing_and_slow_are_unavailable() {
        let base = media_host().await;
        let probe = probe();
        assert!(!probe.is_available(&format!("{}/gone.mp4", base)).await);
        assert!(!probe.is_available(&format!("{}/slow.mp4", base)).await);
        assert!(!probe.is_available("http://127.0.0.1:9/x.mp4").await);
    }

    #[tokio::test]
    async fn test_retain_available() {
        let base = media_host().await;
        let stream = |path: &str| Stream {
            url: format!("{}{}", base, path),
            name: "Library".to_string(),
            title: None,
            behavior_hints: None,
        };
        let kept = probe()
            .retain_available(vec![stream("/gone.mp4"), stream("/ok.mp4")])
            .await;
        assert_eq!(kept.len(), 1);
        assert!(kept[0].url.ends_with("/ok.mp4"));
    }
}
