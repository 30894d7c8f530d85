use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Declared content kind of a playlist entry (`tvg-type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Unknown,
}

impl Default for MediaKind {
    fn default() -> Self {
        Self::Unknown
    }
}

impl MediaKind {
    /// Map a declared `tvg-type` value to a kind (case-insensitive)
    pub fn from_declared(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" | "vod" => MediaKind::Movie,
            "tv" | "series" | "serie" | "show" | "tvshow" | "tv_show" | "tv-show" => {
                MediaKind::Series
            }
            _ => MediaKind::Unknown,
        }
    }

    /// Parse the `type` path segment of an add-on request
    pub fn from_request(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaKind::Movie),
            "series" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Season/episode pair extracted from an `SxxEyy` marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeNumber {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeNumber {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Display label, always `S{season:02}E{episode:02}`
    pub fn label(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// One `#EXTINF` declaration from the source playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// `tvg-id`, may be empty
    pub external_id: String,
    /// `tvg-name`
    pub name: String,
    pub kind: MediaKind,
    /// `tvg-logo`
    pub logo: String,
    /// `group-title`
    pub group: String,
    /// Free text after the first unquoted comma (falls back to `tvg-name`)
    pub title: String,
    /// Media locator on the following non-comment line, if any
    pub url: Option<String>,
    /// Marker found in `tvg-name`, then in the title
    pub episode: Option<EpisodeNumber>,
    /// Ordinal position in the source playlist
    pub position: usize,
}

impl PlaylistEntry {
    /// Title text if present, otherwise the declared name
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// Aggregated movie, one per grouping key
#[derive(Debug, Clone)]
pub struct MovieCandidate {
    pub key: String,
    /// Numeric external id when the key came from `tvg-id`
    pub external_id: Option<String>,
    /// First entry seen under the key
    pub entry: PlaylistEntry,
    pub url: Option<String>,
    pub genres: Vec<String>,
}

/// Aggregated series with its distinct episodes
#[derive(Debug, Clone)]
pub struct SeriesCandidate {
    pub key: String,
    pub external_id: Option<String>,
    pub entry: PlaylistEntry,
    pub episodes: BTreeSet<EpisodeNumber>,
    /// First URL seen per episode
    pub episode_urls: HashMap<EpisodeNumber, String>,
    pub genres: Vec<String>,
}

/// A candidate of either kind, as handed to the resolver
#[derive(Debug, Clone)]
pub enum Candidate {
    Movie(MovieCandidate),
    Series(SeriesCandidate),
}

impl Candidate {
    pub fn kind(&self) -> MediaKind {
        match self {
            Candidate::Movie(_) => MediaKind::Movie,
            Candidate::Series(_) => MediaKind::Series,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Candidate::Movie(m) => &m.key,
            Candidate::Series(s) => &s.key,
        }
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            Candidate::Movie(m) => m.external_id.as_deref(),
            Candidate::Series(s) => s.external_id.as_deref(),
        }
    }

    pub fn entry(&self) -> &PlaylistEntry {
        match self {
            Candidate::Movie(m) => &m.entry,
            Candidate::Series(s) => &s.entry,
        }
    }

    pub fn position(&self) -> usize {
        self.entry().position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_synonyms() {
        assert_eq!(MediaKind::from_declared("movie"), MediaKind::Movie);
        assert_eq!(MediaKind::from_declared("MOVIE"), MediaKind::Movie);
        assert_eq!(MediaKind::from_declared("tv"), MediaKind::Series);
        assert_eq!(MediaKind::from_declared("Series"), MediaKind::Series);
        assert_eq!(MediaKind::from_declared("live"), MediaKind::Unknown);
        assert_eq!(MediaKind::from_declared(""), MediaKind::Unknown);
    }

    #[test]
    fn test_episode_label() {
        assert_eq!(EpisodeNumber::new(1, 2).label(), "S01E02");
        assert_eq!(EpisodeNumber::new(12, 105).label(), "S12E105");
    }

    #[test]
    fn test_episode_ordering() {
        let mut eps = vec![
            EpisodeNumber::new(2, 1),
            EpisodeNumber::new(1, 10),
            EpisodeNumber::new(1, 2),
        ];
        eps.sort();
        assert_eq!(
            eps,
            vec![
                EpisodeNumber::new(1, 2),
                EpisodeNumber::new(1, 10),
                EpisodeNumber::new(2, 1)
            ]
        );
    }
}
