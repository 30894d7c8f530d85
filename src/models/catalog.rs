use serde::{Deserialize, Serialize};

use super::playlist::{EpisodeNumber, MediaKind};

/// Localized descriptive record from the metadata service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absolute poster URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Episode of a resolved series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDescriptor {
    pub season: u32,
    pub episode: u32,
    /// `{canonical_id}:{season}:{episode}`
    pub id: String,
    /// `SxxEyy`
    pub label: String,
}

impl EpisodeDescriptor {
    pub fn new(canonical_id: &str, number: EpisodeNumber) -> Self {
        Self {
            season: number.season,
            episode: number.episode,
            id: episode_id(canonical_id, number),
            label: number.label(),
        }
    }
}

/// Catalog item kept in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub id: String,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// Ordinal of the representative entry
    pub playlist_order: usize,
    /// Sorted by (season, episode); empty for movies
    #[serde(default)]
    pub episodes: Vec<EpisodeDescriptor>,
}

/// Build the composite id of an episode
pub fn episode_id(canonical_id: &str, number: EpisodeNumber) -> String {
    format!("{}:{}:{}", canonical_id, number.season, number.episode)
}

/// Split a composite episode id back into (base id, episode)
///
/// The base id may itself contain colons (`m3u:series:foo`), so the two
/// numeric components are taken from the right.
pub fn parse_episode_id(id: &str) -> Option<(&str, EpisodeNumber)> {
    let (rest, episode) = id.rsplit_once(':')?;
    let (base, season) = rest.rsplit_once(':')?;
    if base.is_empty() {
        return None;
    }
    let season = season.parse().ok()?;
    let episode = episode.parse().ok()?;
    Some((base, EpisodeNumber::new(season, episode)))
}
