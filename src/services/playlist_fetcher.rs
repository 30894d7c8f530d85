use async_trait::async_trait;
use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{redirect, Client, Response};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::error::{FetchError, FormatError, PlaylistError};

lazy_static! {
    /// Content marker of an M3U playlist (header or a declaration)
    static ref PLAYLIST_MARKER: Regex = Regex::new(r"(?i)#EXT(M3U|INF)").unwrap();
}

/// Where the raw playlist text comes from
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Retrieve the raw playlist text
    async fn fetch(&self) -> Result<String, PlaylistError>;
}

/// Check that a body plausibly is a playlist and not an error page
pub fn validate_playlist_text(text: &str) -> Result<(), FormatError> {
    if PLAYLIST_MARKER.is_match(text) {
        return Ok(());
    }

    let head: String = text.trim_start().chars().take(80).collect();
    let hint = if head.starts_with('<') {
        "received HTML instead of M3U, the link likely points to a web page"
    } else if head.is_empty() {
        "empty response body"
    } else {
        "no #EXTM3U header or #EXTINF declaration found"
    };
    Err(FormatError(hint.to_string()))
}

/// Playlist fetched over HTTP(S)
pub struct HttpPlaylistSource {
    client: Client,
    url: String,
    max_retries: u32,
    max_m3u_size_mb: usize,
}

impl HttpPlaylistSource {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.fetch_timeout())
            .redirect(redirect::Policy::limited(10))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            url: config.playlist_url.clone(),
            max_retries: config.max_retries,
            max_m3u_size_mb: config.max_m3u_size_mb,
        })
    }

    fn max_bytes(&self) -> u64 {
        (self.max_m3u_size_mb as u64) * 1024 * 1024
    }

    fn too_large(&self, len: u64) -> FetchError {
        FetchError::TooLarge {
            size_mb: len as f64 / 1024f64 / 1024f64,
            limit_mb: self.max_m3u_size_mb,
        }
    }

    async fn fetch_with_retry(&self) -> Result<Response, FetchError> {
        let mut attempt = 0;

        loop {
            match self.client.get(&self.url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        if let Some(len) = resp.content_length() {
                            if len > self.max_bytes() {
                                return Err(self.too_large(len));
                            }
                        }
                        return Ok(resp);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let backoff_ms = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "429", "backoff_ms" = backoff_ms);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(FetchError::status(status));
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        let backoff_ms = backoff_ms(attempt);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "network", "backoff_ms" = backoff_ms);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Read the body, enforcing the size cap when no length was declared
    async fn read_body(&self, response: Response) -> Result<String, FetchError> {
        let max_bytes = self.max_bytes();
        let mut body: Vec<u8> = Vec::new();
        let mut chunks = response.bytes_stream();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            if body.len() as u64 > max_bytes {
                return Err(self.too_large(body.len() as u64));
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn backoff_ms(attempt: u32) -> u64 {
    (1u64 << attempt.min(16)).saturating_mul(500).min(10_000)
}

#[async_trait]
impl PlaylistSource for HttpPlaylistSource {
    async fn fetch(&self) -> Result<String, PlaylistError> {
        tracing::info!("Fetching playlist: {}", self.url);

        let response = self.fetch_with_retry().await?;
        let text = self.read_body(response).await?;

        let head: String = text.chars().take(200).collect();
        tracing::debug!("Playlist head: {}", head);
        tracing::info!("Playlist size: {:.2} MB", text.len() as f64 / 1024.0 / 1024.0);

        validate_playlist_text(&text)?;
        Ok(text)
    }
}
