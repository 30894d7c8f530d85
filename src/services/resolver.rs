//! Resolves candidates to canonical ids
//!
//! Each batch runs through a bounded `buffer_unordered` pool (one limit for
//! movies, one for series). Results are memoized for the process lifetime:
//! a mapping or a definitive "no mapping" is cached, a transport failure is not
//! and will be retried on the next refresh. A failing candidate is dropped and
//! never aborts its siblings.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::models::{Candidate, Enrichment, MediaKind};
use crate::services::aggregator::slugify;
use crate::services::metrics::{ENRICHMENTS, RESOLUTIONS};
use crate::services::tmdb::{MetadataProvider, ResolutionError};

type CacheKey = (MediaKind, String);

/// A candidate that obtained a canonical id
#[derive(Debug, Clone)]
pub struct ResolvedCandidate {
    pub candidate: Candidate,
    pub canonical_id: String,
    /// Best-effort localized metadata
    pub enrichment: Option<Enrichment>,
}

pub struct IdResolver {
    /// `None`: no credential configured, ids are derived from grouping keys
    provider: Option<Arc<dyn MetadataProvider>>,
    ids: Mutex<HashMap<CacheKey, Option<String>>>,
    details: Mutex<HashMap<CacheKey, Enrichment>>,
    movie_limit: usize,
    series_limit: usize,
    enrich: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Canonical id used when no remote service is configured
pub fn passthrough_id(kind: MediaKind, key: &str) -> String {
    format!("m3u:{}:{}", kind, slugify(key))
}

impl IdResolver {
    pub fn new(provider: Option<Arc<dyn MetadataProvider>>, config: &Config) -> Self {
        Self {
            provider,
            ids: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            movie_limit: config.movie_concurrency.max(1),
            series_limit: config.series_concurrency.max(1),
            enrich: config.tmdb_enrich,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.provider.is_none()
    }

    /// Canonical id for one external id
    ///
    /// `Ok(None)` is the definitive "no mapping" answer and is cached like a hit.
    pub async fn resolve(
        &self,
        kind: MediaKind,
        external_id: &str,
    ) -> Result<Option<String>, ResolutionError> {
        let key = (kind, external_id.to_string());
        if let Some(cached) = lock(&self.ids).get(&key) {
            tracing::debug!("Resolution cache hit for {} {}", kind, external_id);
            RESOLUTIONS.with_label_values(&[&kind.to_string(), "cache_hit"]).inc();
            return Ok(cached.clone());
        }

        let Some(provider) = &self.provider else {
            return Ok(None);
        };

        let result = provider.resolve_id(kind, external_id).await;
        match &result {
            Ok(id) => {
                let outcome = if id.is_some() { "resolved" } else { "not_found" };
                RESOLUTIONS.with_label_values(&[&kind.to_string(), outcome]).inc();
                lock(&self.ids).insert(key, id.clone());
            }
            Err(_) => {
                RESOLUTIONS.with_label_values(&[&kind.to_string(), "error"]).inc();
            }
        }
        result
    }

    /// Localized metadata; failures are logged and yield `None`
    async fn enrichment(&self, kind: MediaKind, external_id: &str) -> Option<Enrichment> {
        let provider = self.provider.as_ref()?;
        let key = (kind, external_id.to_string());

        if let Some(cached) = lock(&self.details).get(&key) {
            ENRICHMENTS.with_label_values(&["cache_hit"]).inc();
            return Some(cached.clone());
        }

        match provider.details(kind, external_id).await {
            Ok(details) => {
                ENRICHMENTS.with_label_values(&["ok"]).inc();
                lock(&self.details).insert(key, details.clone());
                Some(details)
            }
            Err(e) => {
                ENRICHMENTS.with_label_values(&["error"]).inc();
                tracing::warn!("Enrichment failed for {} {}: {}", kind, external_id, e);
                None
            }
        }
    }

    /// Resolve one candidate, `None` when it must be dropped
    async fn resolve_candidate(&self, candidate: Candidate) -> Option<ResolvedCandidate> {
        let kind = candidate.kind();

        if self.is_passthrough() {
            let canonical_id = passthrough_id(kind, candidate.key());
            return Some(ResolvedCandidate {
                candidate,
                canonical_id,
                enrichment: None,
            });
        }

        let Some(external_id) = candidate.external_id().map(str::to_string) else {
            tracing::debug!("No numeric id for {} '{}', dropped", kind, candidate.key());
            RESOLUTIONS.with_label_values(&[&kind.to_string(), "not_found"]).inc();
            return None;
        };

        let canonical_id = match self.resolve(kind, &external_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!("No mapping for {} {}, dropped", kind, external_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Resolution failed for {} {}: {}", kind, external_id, e);
                return None;
            }
        };

        let enrichment = if self.enrich {
            self.enrichment(kind, &external_id).await
        } else {
            None
        };

        Some(ResolvedCandidate {
            candidate,
            canonical_id,
            enrichment,
        })
    }

    /// Resolve a batch with at most `limit` lookups in flight
    ///
    /// The output follows playlist order, whatever the completion order was.
    pub async fn resolve_batch(&self, candidates: Vec<Candidate>, limit: usize) -> Vec<ResolvedCandidate> {
        let total = candidates.len();
        let mut resolved: Vec<ResolvedCandidate> = stream::iter(candidates)
            .map(|candidate| self.resolve_candidate(candidate))
            .buffer_unordered(limit.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;

        resolved.sort_by_key(|r| r.candidate.position());

        if total > 0 {
            tracing::info!("Resolved {}/{} candidates", resolved.len(), total);
        }
        resolved
    }

    /// Resolve movies and series, each batch under its own limit
    pub async fn resolve_all(
        &self,
        movies: Vec<Candidate>,
        series: Vec<Candidate>,
    ) -> (Vec<ResolvedCandidate>, Vec<ResolvedCandidate>) {
        tokio::join!(
            self.resolve_batch(movies, self.movie_limit),
            self.resolve_batch(series, self.series_limit)
        )
    }
}
