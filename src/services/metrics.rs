//! Prometheus counters, exported by `GET /metrics`

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

lazy_static! {
    /// Catalog refresh cycles by outcome (ok, fetch_error, format_error)
    pub static ref REFRESHES: IntCounterVec = register_int_counter_vec!(
        "catalog_refreshes_total",
        "Catalog refresh cycles by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Id resolutions by kind and outcome (cache_hit, resolved, not_found, error)
    pub static ref RESOLUTIONS: IntCounterVec = register_int_counter_vec!(
        "catalog_resolutions_total",
        "External id resolutions by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap();

    /// Enrichment lookups by outcome (cache_hit, ok, error)
    pub static ref ENRICHMENTS: IntCounterVec = register_int_counter_vec!(
        "catalog_enrichments_total",
        "Localized metadata lookups by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Direct stream probes by outcome (available, unavailable)
    pub static ref STREAM_PROBES: IntCounterVec = register_int_counter_vec!(
        "catalog_stream_probes_total",
        "Direct stream validity probes by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Items in the current snapshot by kind
    pub static ref CATALOG_ITEMS: IntGaugeVec = register_int_gauge_vec!(
        "catalog_items",
        "Items in the current catalog snapshot",
        &["kind"]
    )
    .unwrap();
}
