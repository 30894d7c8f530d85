//! Groups parsed entries into movie and series candidates
//!
//! Grouping key: the external id when it is all digits, otherwise a key derived
//! from the cleaned display name. The first entry under a key is the
//! representative; later entries only contribute episodes and missing URLs.
//! Direct URLs are first-write-wins, per movie and per (season, episode).

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{MediaKind, MovieCandidate, PlaylistEntry, SeriesCandidate};
use crate::services::m3u_parser::strip_episode_marker;

/// Result of one aggregation pass, candidates in playlist order
#[derive(Debug, Default)]
pub struct Aggregation {
    pub movies: Vec<MovieCandidate>,
    pub series: Vec<SeriesCandidate>,
    /// Distinct genre labels observed per kind, first-seen casing and order
    pub movie_genres: Vec<String>,
    pub series_genres: Vec<String>,
    /// Entries dropped: unrecognized kind, missing episode marker, no usable key
    pub skipped: usize,
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Grouping key plus the external id it came from, if any
fn grouping_key(external_id: &str, derived_name: &str) -> Option<(String, Option<String>)> {
    let external_id = external_id.trim();
    if is_numeric_id(external_id) {
        return Some((external_id.to_string(), Some(external_id.to_string())));
    }

    let name = derived_name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((format!("name:{}", name), None))
}

/// Series title without the episode marker and what follows it
pub fn series_display_name(entry: &PlaylistEntry) -> String {
    [entry.display_name(), entry.name.as_str()]
        .iter()
        .map(|t| strip_episode_marker(t))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| entry.display_name().to_string())
}

/// Split a group label on `/`, `|` and `,` into distinct genres
///
/// Duplicates are removed case-insensitively, keeping first-seen casing and order.
pub fn split_genres(group: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    group
        .split(|c| matches!(c, '/' | '|' | ','))
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .filter(|g| seen.insert(g.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Lowercase slug used for genre filters and passthrough ids ("Sci-Fi & Fantasy" -> "sci-fi-fantasy")
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Merge genre labels into an observed set (case-insensitive)
fn observe_genres(observed: &mut Vec<String>, seen: &mut HashSet<String>, genres: &[String]) {
    for genre in genres {
        if seen.insert(genre.to_lowercase()) {
            observed.push(genre.clone());
        }
    }
}

/// Aggregate entries into candidates
pub fn aggregate(entries: &[PlaylistEntry]) -> Aggregation {
    let mut result = Aggregation::default();
    let mut movie_index: HashMap<String, usize> = HashMap::new();
    let mut series_index: HashMap<String, usize> = HashMap::new();
    let mut movie_seen = HashSet::new();
    let mut series_seen = HashSet::new();

    for entry in entries {
        match entry.kind {
            MediaKind::Movie => {
                let Some((key, external_id)) = grouping_key(&entry.external_id, entry.display_name())
                else {
                    result.skipped += 1;
                    continue;
                };

                if let Some(&idx) = movie_index.get(&key) {
                    let candidate = &mut result.movies[idx];
                    if candidate.url.is_none() {
                        candidate.url = entry.url.clone();
                    }
                    continue;
                }

                let genres = split_genres(&entry.group);
                observe_genres(&mut result.movie_genres, &mut movie_seen, &genres);
                movie_index.insert(key.clone(), result.movies.len());
                result.movies.push(MovieCandidate {
                    key,
                    external_id,
                    entry: entry.clone(),
                    url: entry.url.clone(),
                    genres,
                });
            }
            MediaKind::Series => {
                let Some(episode) = entry.episode else {
                    result.skipped += 1;
                    continue;
                };
                let Some((key, external_id)) =
                    grouping_key(&entry.external_id, &series_display_name(entry))
                else {
                    result.skipped += 1;
                    continue;
                };

                let idx = match series_index.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let genres = split_genres(&entry.group);
                        observe_genres(&mut result.series_genres, &mut series_seen, &genres);
                        series_index.insert(key.clone(), result.series.len());
                        result.series.push(SeriesCandidate {
                            key,
                            external_id,
                            entry: entry.clone(),
                            episodes: BTreeSet::new(),
                            episode_urls: HashMap::new(),
                            genres,
                        });
                        result.series.len() - 1
                    }
                };

                let candidate = &mut result.series[idx];
                candidate.episodes.insert(episode);
                if let Some(url) = &entry.url {
                    candidate
                        .episode_urls
                        .entry(episode)
                        .or_insert_with(|| url.clone());
                }
            }
            MediaKind::Unknown => result.skipped += 1,
        }
    }

    // Vec order already follows first appearance; make it explicit
    result.movies.sort_by_key(|c| c.entry.position);
    result.series.sort_by_key(|c| c.entry.position);

    tracing::info!(
        "Aggregated {} movies and {} series ({} entries skipped)",
        result.movies.len(),
        result.series.len(),
        result.skipped
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpisodeNumber;
    use crate::services::m3u_parser::parse_playlist;

    #[test]
    fn test_movie_dedup_first_entry_wins() {
        let text = r#"#EXTINF:-1 tvg-id="603" tvg-type="movie" tvg-logo="first.jpg" group-title="Action",The Matrix
#EXTINF:-1 tvg-id="603" tvg-type="movie" tvg-logo="second.jpg" group-title="Drama",The Matrix (dup)
http://media/dup.mp4
#EXTINF:-1 tvg-id="603" tvg-type="movie",The Matrix (third)
http://media/third.mp4
"#;
        let agg = aggregate(&parse_playlist(text));
        assert_eq!(agg.movies.len(), 1);

        let movie = &agg.movies[0];
        assert_eq!(movie.key, "603");
        assert_eq!(movie.external_id.as_deref(), Some("603"));
        assert_eq!(movie.entry.logo, "first.jpg");
        assert_eq!(movie.genres, vec!["Action"]);
        // First entry had no locator: the first later one fills it, the next does not override
        assert_eq!(movie.url.as_deref(), Some("http://media/dup.mp4"));
    }

    #[test]
    fn test_series_episodes_merge() {
        let text = r#"#EXTINF:-1 tvg-id="1399" tvg-type="tv" tvg-name="Show S01E02",Show S01E02
http://media/1-2-a.mkv
#EXTINF:-1 tvg-id="1399" tvg-type="tv" tvg-name="Show S01E01",Show S01E01
http://media/1-1.mkv
#EXTINF:-1 tvg-id="1399" tvg-type="tv" tvg-name="Show S01E02",Show S01E02
http://media/1-2-b.mkv
"#;
        let agg = aggregate(&parse_playlist(text));
        assert_eq!(agg.series.len(), 1);

        let series = &agg.series[0];
        let episodes: Vec<_> = series.episodes.iter().copied().collect();
        assert_eq!(episodes, vec![EpisodeNumber::new(1, 1), EpisodeNumber::new(1, 2)]);
        assert_eq!(
            series.episode_urls.get(&EpisodeNumber::new(1, 2)).map(String::as_str),
            Some("http://media/1-2-a.mkv")
        );
        assert_eq!(series.entry.position, 0);
    }

    #[test]
    fn test_series_without_marker_is_skipped() {
        let text = "#EXTINF:-1 tvg-id=\"1399\" tvg-type=\"tv\",Show Trailer\n";
        let agg = aggregate(&parse_playlist(text));
        assert!(agg.series.is_empty());
        assert_eq!(agg.skipped, 1);
    }

    #[test]
    fn test_movies_never_become_series() {
        let text = "#EXTINF:-1 tvg-id=\"10\" tvg-type=\"movie\",Harry Potter S01E01\n";
        let agg = aggregate(&parse_playlist(text));
        assert_eq!(agg.movies.len(), 1);
        assert!(agg.series.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_dropped() {
        let text = "#EXTINF:-1 tvg-id=\"5\" tvg-type=\"live\",News\n#EXTINF:-1,No Type\n";
        let agg = aggregate(&parse_playlist(text));
        assert!(agg.movies.is_empty());
        assert!(agg.series.is_empty());
        assert_eq!(agg.skipped, 2);
    }

    #[test]
    fn test_name_key_fallback() {
        let text = r#"#EXTINF:-1 tvg-id="tt0133093" tvg-type="movie",The  Matrix
#EXTINF:-1 tvg-type="movie",the matrix
#EXTINF:-1 tvg-type="tv" tvg-name="Other Show S02E01",Other Show S02E01
#EXTINF:-1 tvg-type="tv" tvg-name="Other Show - S02E03",Other Show - S02E03
"#;
        let agg = aggregate(&parse_playlist(text));
        assert_eq!(agg.movies.len(), 1);
        assert_eq!(agg.movies[0].key, "name:the matrix");
        assert_eq!(agg.movies[0].external_id, None);

        assert_eq!(agg.series.len(), 1);
        assert_eq!(agg.series[0].key, "name:other show");
        assert_eq!(agg.series[0].episodes.len(), 2);
    }

    #[test]
    fn test_series_display_name() {
        let entries = parse_playlist("#EXTINF:-1 tvg-type=\"tv\" tvg-name=\"Dark S01E01\",S01E01\n");
        assert_eq!(series_display_name(&entries[0]), "Dark");
    }

    #[test]
    fn test_split_genres() {
        assert_eq!(
            split_genres("Action / Sci-Fi | action, Drama ,"),
            vec!["Action", "Sci-Fi", "Drama"]
        );
        assert!(split_genres("").is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Sci-Fi & Fantasy"), "sci-fi-fantasy");
        assert_eq!(slugify("  Drama "), "drama");
        assert_eq!(slugify("Animação"), "animação");
        assert_eq!(slugify("*Kids"), "kids");
    }

    #[test]
    fn test_observed_genres_per_kind() {
        let text = r#"#EXTINF:-1 tvg-id="1" tvg-type="movie" group-title="Action|Drama",A
#EXTINF:-1 tvg-id="2" tvg-type="movie" group-title="drama / Comedy",B
#EXTINF:-1 tvg-id="3" tvg-type="tv" group-title="Crime",C S01E01
"#;
        let agg = aggregate(&parse_playlist(text));
        assert_eq!(agg.movie_genres, vec!["Action", "Drama", "Comedy"]);
        assert_eq!(agg.series_genres, vec!["Crime"]);
    }
}
