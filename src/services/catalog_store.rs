//! Catalog snapshot store
//!
//! Holds one immutable [`Snapshot`] behind an `Arc`. A refresh builds a
//! complete new snapshot and swaps the pointer; readers keep whatever `Arc`
//! they already cloned. Refreshes are single-flight: callers that queue behind
//! a running refresh reuse its result instead of starting another cycle.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::PlaylistError;
use crate::models::{
    Candidate, EpisodeDescriptor, EpisodeNumber, MediaKind, ResolvedItem,
};
use crate::services::aggregator::{aggregate, series_display_name};
use crate::services::m3u_parser::parse_playlist;
use crate::services::metrics::{CATALOG_ITEMS, REFRESHES};
use crate::services::playlist_fetcher::PlaylistSource;
use crate::services::resolver::{IdResolver, ResolvedCandidate};

/// One complete materialization of the catalog
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Start of the fetch that produced this snapshot, `None` until the first load
    pub loaded_at: Option<Instant>,
    pub loaded_at_utc: Option<DateTime<Utc>>,
    /// Playlist order
    pub movies: Vec<ResolvedItem>,
    pub series: Vec<ResolvedItem>,
    /// canonical id -> (kind, index into `movies`/`series`)
    by_id: HashMap<String, (MediaKind, usize)>,
    movie_urls: HashMap<String, String>,
    episode_urls: HashMap<String, HashMap<EpisodeNumber, String>>,
    /// Sorted case-insensitively
    pub movie_genres: Vec<String>,
    pub series_genres: Vec<String>,
}

fn sorted_genres(items: &[ResolvedItem]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut genres: Vec<String> = items
        .iter()
        .flat_map(|item| item.genres.iter())
        .filter(|g| seen.insert(g.to_lowercase()))
        .cloned()
        .collect();
    genres.sort_by_key(|g| g.to_lowercase());
    genres
}

impl Snapshot {
    /// Build a snapshot from resolved candidates (each list already in playlist order)
    ///
    /// `fetched_at` is when the playlist fetch started; the TTL counts from there.
    pub fn build(
        movies: Vec<ResolvedCandidate>,
        series: Vec<ResolvedCandidate>,
        fetched_at: Instant,
    ) -> Self {
        let mut snapshot = Snapshot {
            loaded_at: Some(fetched_at),
            loaded_at_utc: Some(Utc::now()),
            ..Snapshot::default()
        };

        for resolved in movies.into_iter().chain(series) {
            // Two source keys can map to one canonical id; the earlier wins
            if snapshot.by_id.contains_key(&resolved.canonical_id) {
                tracing::debug!(
                    "Duplicate canonical id {} for '{}', skipped",
                    resolved.canonical_id,
                    resolved.candidate.key()
                );
                continue;
            }
            snapshot.insert(resolved);
        }

        snapshot.movie_genres = sorted_genres(&snapshot.movies);
        snapshot.series_genres = sorted_genres(&snapshot.series);
        snapshot
    }

    fn insert(&mut self, resolved: ResolvedCandidate) {
        let ResolvedCandidate {
            candidate,
            canonical_id,
            enrichment,
        } = resolved;
        let enrichment = enrichment.unwrap_or_default();

        let entry = candidate.entry();
        let logo = Some(entry.logo.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let mut item = ResolvedItem {
            id: canonical_id.clone(),
            kind: candidate.kind(),
            external_id: candidate.external_id().map(str::to_string),
            name: entry.display_name().to_string(),
            poster: enrichment.poster.or(logo),
            genres: Vec::new(),
            description: enrichment.description,
            year: enrichment.year,
            runtime: enrichment.runtime,
            rating: enrichment.rating.filter(|r| *r > 0.0),
            playlist_order: entry.position,
            episodes: Vec::new(),
        };

        match candidate {
            Candidate::Movie(movie) => {
                item.genres = movie.genres;
                if let Some(url) = movie.url {
                    self.movie_urls.insert(canonical_id.clone(), url);
                }
                self.by_id
                    .insert(canonical_id, (MediaKind::Movie, self.movies.len()));
                self.movies.push(item);
            }
            Candidate::Series(series) => {
                item.name = series_display_name(&series.entry);
                item.genres = series.genres;
                item.episodes = series
                    .episodes
                    .iter()
                    .map(|number| EpisodeDescriptor::new(&canonical_id, *number))
                    .collect();
                if !series.episode_urls.is_empty() {
                    self.episode_urls
                        .insert(canonical_id.clone(), series.episode_urls);
                }
                self.by_id
                    .insert(canonical_id, (MediaKind::Series, self.series.len()));
                self.series.push(item);
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.is_some_and(|at| at.elapsed() < ttl)
    }

    pub fn items(&self, kind: MediaKind) -> &[ResolvedItem] {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Series => &self.series,
            MediaKind::Unknown => &[],
        }
    }

    pub fn genres(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Movie => &self.movie_genres,
            MediaKind::Series => &self.series_genres,
            MediaKind::Unknown => &[],
        }
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedItem> {
        let (kind, idx) = self.by_id.get(id)?;
        self.items(*kind).get(*idx)
    }

    pub fn movie_url(&self, id: &str) -> Option<&str> {
        self.movie_urls.get(id).map(String::as_str)
    }

    pub fn episode_url(&self, id: &str, number: EpisodeNumber) -> Option<&str> {
        self.episode_urls.get(id)?.get(&number).map(String::as_str)
    }
}

/// Outcome of the most recent refresh attempt
struct Attempt {
    started: Instant,
    finished: Instant,
    /// `None` when the attempt installed a new snapshot
    error: Option<Arc<PlaylistError>>,
}

impl Attempt {
    /// Whether this attempt answers a request made at `requested_at`
    ///
    /// A forced request needs playlist data fetched after it was made; a
    /// regular one accepts any attempt still running when it was made.
    fn covers(&self, requested_at: Instant, force: bool) -> bool {
        if force {
            self.started >= requested_at
        } else {
            self.finished >= requested_at
        }
    }
}

pub struct CatalogStore {
    snapshot: RwLock<Arc<Snapshot>>,
    /// Single-flight guard, holding the last attempt's outcome
    refresh_lock: Mutex<Option<Attempt>>,
    ttl: Duration,
    source: Arc<dyn PlaylistSource>,
    resolver: IdResolver,
}

impl CatalogStore {
    pub fn new(source: Arc<dyn PlaylistSource>, resolver: IdResolver, ttl: Duration) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refresh_lock: Mutex::new(None),
            ttl,
            source,
            resolver,
        }
    }

    /// Current snapshot without triggering a refresh
    pub async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Snapshot to serve, refreshing first when stale, empty or forced
    ///
    /// A failed refresh falls back to the previously loaded snapshot; the
    /// error is returned only when nothing was ever loaded.
    pub async fn ensure_fresh(&self, force: bool) -> Result<Arc<Snapshot>, Arc<PlaylistError>> {
        let current = self.current().await;
        if !force && current.is_fresh(self.ttl) {
            return Ok(current);
        }

        let requested_at = Instant::now();
        let mut last_attempt = self.refresh_lock.lock().await;

        // An attempt that ran while we waited answers this request too
        let current = self.current().await;
        if let Some(attempt) = last_attempt.as_ref().filter(|a| a.covers(requested_at, force)) {
            return Self::serve(current, attempt.error.clone());
        }
        if !force && current.is_fresh(self.ttl) {
            return Ok(current);
        }

        let started = Instant::now();
        let error = match self.refresh(started).await {
            Ok(snapshot) => {
                CATALOG_ITEMS
                    .with_label_values(&["movie"])
                    .set(snapshot.movies.len() as i64);
                CATALOG_ITEMS
                    .with_label_values(&["series"])
                    .set(snapshot.series.len() as i64);
                *self.snapshot.write().await = Arc::new(snapshot);
                REFRESHES.with_label_values(&["ok"]).inc();
                None
            }
            Err(e) => {
                REFRESHES.with_label_values(&[e.label()]).inc();
                if current.is_loaded() {
                    tracing::error!("Catalog refresh failed, serving previous snapshot: {}", e);
                } else {
                    tracing::error!("Initial catalog load failed: {}", e);
                }
                Some(Arc::new(e))
            }
        };

        *last_attempt = Some(Attempt {
            started,
            finished: Instant::now(),
            error: error.clone(),
        });
        Self::serve(self.current().await, error)
    }

    fn serve(
        current: Arc<Snapshot>,
        error: Option<Arc<PlaylistError>>,
    ) -> Result<Arc<Snapshot>, Arc<PlaylistError>> {
        match error {
            Some(e) if !current.is_loaded() => Err(e),
            _ => Ok(current),
        }
    }

    /// Fetch, parse, aggregate and resolve into a new snapshot
    async fn refresh(&self, started: Instant) -> Result<Snapshot, PlaylistError> {
        tracing::info!("Refreshing catalog");

        let text = self.source.fetch().await?;
        let entries = parse_playlist(&text);
        let aggregation = aggregate(&entries);

        let movies = aggregation.movies.into_iter().map(Candidate::Movie).collect();
        let series = aggregation.series.into_iter().map(Candidate::Series).collect();
        let (movies, series) = self.resolver.resolve_all(movies, series).await;

        let snapshot = Snapshot::build(movies, series, started);
        tracing::info!(
            "Catalog refreshed in {}ms: {} entries, {} movies, {} series",
            started.elapsed().as_millis(),
            entries.len(),
            snapshot.movies.len(),
            snapshot.series.len()
        );
        Ok(snapshot)
    }
}
