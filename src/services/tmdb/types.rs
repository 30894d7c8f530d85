//! TMDb API Types
//!
//! Only the fields this service consumes are modelled.

use serde::Deserialize;

use crate::models::Enrichment;

/// Response of `/{movie|tv}/{id}/external_ids`
#[derive(Debug, Deserialize, Clone)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl TmdbExternalIds {
    /// IMDb id if present and non-empty
    pub fn imdb(&self) -> Option<String> {
        self.imdb_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Response of `/movie/{id}`
#[derive(Debug, Deserialize, Clone)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: Option<f32>,
}

/// Response of `/tv/{id}`
#[derive(Debug, Deserialize, Clone)]
pub struct TmdbTvDetails {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub vote_average: Option<f32>,
}

/// Year from a `YYYY-MM-DD` date
fn year_of(date: Option<&str>) -> Option<u16> {
    date?.get(..4)?.parse().ok()
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn poster_url(image_base: &str, path: Option<String>) -> Option<String> {
    non_empty(path).map(|p| format!("{}{}", image_base.trim_end_matches('/'), p))
}

fn positive(value: Option<f32>) -> Option<f32> {
    value.filter(|v| *v > 0.0)
}

impl TmdbMovieDetails {
    pub fn into_enrichment(self, image_base: &str) -> Enrichment {
        Enrichment {
            year: year_of(self.release_date.as_deref()),
            description: non_empty(self.overview),
            poster: poster_url(image_base, self.poster_path),
            runtime: self.runtime.filter(|r| *r > 0),
            rating: positive(self.vote_average),
        }
    }
}

impl TmdbTvDetails {
    pub fn into_enrichment(self, image_base: &str) -> Enrichment {
        Enrichment {
            year: year_of(self.first_air_date.as_deref()),
            description: non_empty(self.overview),
            poster: poster_url(image_base, self.poster_path),
            runtime: self.episode_run_time.into_iter().find(|r| *r > 0),
            rating: positive(self.vote_average),
        }
    }
}
