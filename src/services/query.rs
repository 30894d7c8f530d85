//! Read-side queries over a snapshot: catalog pages, detail lookup, streams

use crate::config::StreamMode;
use crate::models::{
    parse_episode_id, BehaviorHints, MediaKind, Meta, ResolvedItem, Stream,
};
use crate::services::aggregator::slugify;
use crate::services::catalog_store::Snapshot;

/// Genre labels that push an item to the end of unfiltered listings
#[derive(Debug, Clone)]
pub struct GenreMarker {
    prefix: String,
}

impl GenreMarker {
    /// An empty prefix disables the marker
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_string(),
        }
    }

    pub fn is_marked(&self, genre: &str) -> bool {
        !self.prefix.is_empty() && genre.trim_start().starts_with(&self.prefix)
    }

    fn is_deprioritized(&self, item: &ResolvedItem) -> bool {
        item.genres.iter().any(|g| self.is_marked(g))
    }
}

/// One catalog page request
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery<'a> {
    /// Genre label or slug; both normalize to the same slug
    pub genre: Option<&'a str>,
    pub skip: usize,
    pub limit: usize,
}

/// Ordered, paginated catalog listing
///
/// Unfiltered: playlist order with marked items last. Filtered by genre:
/// playlist order only.
pub fn list_catalog(
    snapshot: &Snapshot,
    kind: MediaKind,
    query: &CatalogQuery<'_>,
    marker: &GenreMarker,
) -> Vec<Meta> {
    let items: Vec<&ResolvedItem> = match query.genre.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => {
            let mut items: Vec<_> = snapshot
                .items(kind)
                .iter()
                .filter(|item| item.genres.iter().any(|g| slugify(g) == slug))
                .collect();
            items.sort_by_key(|item| item.playlist_order);
            items
        }
        None => {
            let mut items: Vec<_> = snapshot.items(kind).iter().collect();
            items.sort_by_key(|item| (marker.is_deprioritized(item), item.playlist_order));
            items
        }
    };

    let limit = if query.limit == 0 { items.len() } else { query.limit };
    items
        .into_iter()
        .skip(query.skip)
        .take(limit)
        .map(Meta::preview)
        .collect()
}

/// Detail record for a canonical id of the requested kind
pub fn find_meta(snapshot: &Snapshot, kind: MediaKind, id: &str) -> Option<Meta> {
    snapshot
        .get(id)
        .filter(|item| item.kind == kind)
        .map(Meta::detail)
}

/// Direct streams for a movie id or a composite episode id
///
/// Empty when the playlist had no locator for it; other add-ons may still
/// supply streams.
pub fn find_streams(
    snapshot: &Snapshot,
    kind: MediaKind,
    id: &str,
    mode: StreamMode,
    addon_name: &str,
) -> Vec<Stream> {
    let (base_id, url, title) = match kind {
        MediaKind::Movie => {
            let Some(url) = snapshot.movie_url(id) else {
                return Vec::new();
            };
            let title = snapshot.get(id).map(|item| item.name.clone());
            (id, url, title)
        }
        MediaKind::Series => {
            let Some((base_id, number)) = parse_episode_id(id) else {
                return Vec::new();
            };
            let Some(url) = snapshot.episode_url(base_id, number) else {
                return Vec::new();
            };
            let title = snapshot
                .get(base_id)
                .map(|item| format!("{} {}", item.name, number.label()))
                .or_else(|| Some(number.label()));
            (base_id, url, title)
        }
        MediaKind::Unknown => return Vec::new(),
    };

    let behavior_hints = match mode {
        StreamMode::Autoplay => Some(BehaviorHints {
            binge_group: format!("m3u-{}", base_id),
        }),
        StreamMode::Menu => None,
    };

    vec![Stream {
        url: url.to_string(),
        name: addon_name.to_string(),
        title,
        behavior_hints,
    }]
}
