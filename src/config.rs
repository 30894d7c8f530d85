use anyhow::{bail, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How direct streams are presented to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Streams carry a binge group so episodes chain without the picker
    Autoplay,
    /// Streams are listed in the client's stream picker
    Menu,
}

impl FromStr for StreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoplay" | "auto" => Ok(StreamMode::Autoplay),
            "menu" => Ok(StreamMode::Menu),
            other => Err(format!("unknown stream mode: {}", other)),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub addon_name: String,

    // Playlist
    pub playlist_url: String,
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub max_m3u_size_mb: usize,
    pub cache_ttl_seconds: u64,

    // Metadata service
    pub tmdb_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_image_base: String,
    pub tmdb_language: String,
    pub tmdb_enrich: bool,
    pub tmdb_timeout_ms: u64,
    pub movie_concurrency: usize,
    pub series_concurrency: usize,

    // Streams
    pub stream_mode: StreamMode,
    pub validate_streams: bool,
    pub stream_probe_timeout_ms: u64,

    // Catalog presentation
    pub deprioritized_genre_prefix: String,
    pub catalog_page_size: usize,

    // Misc - Use VLC user agent to avoid hosts rejecting default clients
    pub user_agent: String,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// Fails only when the playlist location is missing.
    pub fn from_env() -> Result<Self> {
        let playlist_url = env::var("PLAYLIST_URL").unwrap_or_default();
        if playlist_url.trim().is_empty() {
            bail!("PLAYLIST_URL is not set");
        }

        let tmdb_key = env::var("TMDB_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self {
            port: var_or("PORT", 7000),
            addon_name: env::var("ADDON_NAME").unwrap_or_else(|_| "M3U Library".to_string()),

            playlist_url: playlist_url.trim().to_string(),
            fetch_timeout_ms: var_or("FETCH_TIMEOUT_MS", 60_000),
            max_retries: var_or("MAX_RETRIES", 2),
            max_m3u_size_mb: var_or("MAX_M3U_SIZE_MB", 100),
            cache_ttl_seconds: var_or("CACHE_TTL_SECONDS", 900), // 15 minutes

            tmdb_key,
            tmdb_base_url: env::var("TMDB_BASE_URL")
                .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string()),
            tmdb_image_base: env::var("TMDB_IMAGE_BASE")
                .unwrap_or_else(|_| "https://image.tmdb.org/t/p/w500".to_string()),
            tmdb_language: env::var("TMDB_LANGUAGE").unwrap_or_else(|_| "en-US".to_string()),
            tmdb_enrich: flag_or("TMDB_ENRICH", true),
            tmdb_timeout_ms: var_or("TMDB_TIMEOUT_MS", 10_000),
            movie_concurrency: var_or("MOVIE_CONCURRENCY", 8usize).max(1),
            series_concurrency: var_or("SERIES_CONCURRENCY", 4usize).max(1),

            stream_mode: var_or("STREAM_MODE", StreamMode::Menu),
            validate_streams: flag_or("VALIDATE_STREAMS", false),
            stream_probe_timeout_ms: var_or("STREAM_PROBE_TIMEOUT_MS", 4_000),

            deprioritized_genre_prefix: env::var("DEPRIORITIZED_GENRE_PREFIX")
                .unwrap_or_else(|_| "*".to_string()),
            catalog_page_size: var_or("CATALOG_PAGE_SIZE", 100usize).max(1),

            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn tmdb_timeout(&self) -> Duration {
        Duration::from_millis(self.tmdb_timeout_ms)
    }

    pub fn stream_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_probe_timeout_ms)
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment
    pub fn for_tests(playlist_url: &str) -> Self {
        Self {
            port: 0,
            addon_name: "M3U Library".to_string(),
            playlist_url: playlist_url.to_string(),
            fetch_timeout_ms: 5_000,
            max_retries: 0,
            max_m3u_size_mb: 10,
            cache_ttl_seconds: 120,
            tmdb_key: None,
            tmdb_base_url: "http://127.0.0.1:9/3".to_string(),
            tmdb_image_base: "https://image.tmdb.org/t/p/w500".to_string(),
            tmdb_language: "en-US".to_string(),
            tmdb_enrich: true,
            tmdb_timeout_ms: 1_000,
            movie_concurrency: 4,
            series_concurrency: 2,
            stream_mode: StreamMode::Menu,
            validate_streams: false,
            stream_probe_timeout_ms: 1_000,
            deprioritized_genre_prefix: "*".to_string(),
            catalog_page_size: 100,
            user_agent: "VLC/3.0.20 LibVLC/3.0.20".to_string(),
        }
    }
}
