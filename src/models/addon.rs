//! Wire types of the add-on protocol (manifest, catalog, meta, stream)

use serde::{Deserialize, Serialize};

use super::catalog::ResolvedItem;
use super::playlist::MediaKind;

/// Catalog identifiers served by this add-on
pub const MOVIE_CATALOG_ID: &str = "m3u-movies";
pub const SERIES_CATALOG_ID: &str = "m3u-series";

/// Add-on manifest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub types: Vec<MediaKind>,
    pub id_prefixes: Vec<String>,
    pub catalogs: Vec<CatalogDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub id: String,
    pub name: String,
    pub extra: Vec<ExtraField>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraField {
    pub name: String,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ExtraField {
    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_required: false,
            options: Vec::new(),
        }
    }

    pub fn with_options(name: &str, options: Vec<String>) -> Self {
        Self {
            options,
            ..Self::optional(name)
        }
    }
}

/// Summary and detail record share one shape; `videos` is only filled for
/// series detail responses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<Video>>,
}

impl Meta {
    /// Catalog summary record
    pub fn preview(item: &ResolvedItem) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            name: item.name.clone(),
            poster: item.poster.clone(),
            description: item.description.clone(),
            genres: item.genres.clone(),
            release_info: item.year.map(|y| y.to_string()),
            runtime: item.runtime.map(|m| format!("{} min", m)),
            imdb_rating: item.rating.map(|r| format!("{:.1}", r)),
            videos: None,
        }
    }

    /// Detail record; series carry their episode list
    pub fn detail(item: &ResolvedItem) -> Self {
        let mut meta = Self::preview(item);
        if item.kind == MediaKind::Series {
            meta.videos = Some(
                item.episodes
                    .iter()
                    .map(|ep| Video {
                        id: ep.id.clone(),
                        title: ep.label.clone(),
                        season: ep.season,
                        episode: ep.episode,
                    })
                    .collect(),
            );
        }
        meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub url: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_hints: Option<BehaviorHints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub binge_group: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<Meta>,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub meta: Option<Meta>,
}

#[derive(Debug, Serialize)]
pub struct StreamsResponse {
    pub streams: Vec<Stream>,
}

/// Extra parameters of a catalog request (`genre=Drama&skip=100`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogExtra {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub refresh: bool,
}

impl CatalogExtra {
    /// Parse the URL-encoded extra path segment; unknown keys are ignored
    pub fn parse(segment: &str) -> Self {
        let mut extra = Self::default();
        for (key, value) in url::form_urlencoded::parse(segment.as_bytes()) {
            match key.as_ref() {
                "genre" if !value.trim().is_empty() => extra.genre = Some(value.into_owned()),
                "skip" => extra.skip = value.parse().unwrap_or(0),
                "refresh" | "force" => {
                    extra.refresh = matches!(value.as_ref(), "1" | "true" | "yes")
                }
                _ => {}
            }
        }
        extra
    }
}
