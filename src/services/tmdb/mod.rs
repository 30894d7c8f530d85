//! TMDb integration
//!
//! Maps numeric TMDb ids from the playlist to IMDb ids (the canonical ids the
//! media client understands) and fetches localized descriptive metadata.
//!
//! # Endpoints consumed
//!
//! ```text
//! GET {base}/movie/{id}/external_ids   -> { "imdb_id": "tt0133093" }
//! GET {base}/tv/{id}/external_ids      -> { "imdb_id": "tt0944947" }
//! GET {base}/movie/{id}?language=xx-YY -> overview, poster_path, release_date, runtime, vote_average
//! GET {base}/tv/{id}?language=xx-YY    -> overview, poster_path, first_air_date, episode_run_time, vote_average
//! ```

pub mod client;
pub mod types;

pub use client::{MetadataProvider, ResolutionError, TmdbClient};
