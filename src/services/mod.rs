pub mod aggregator;
pub mod catalog_store;
pub mod m3u_parser;
pub mod metrics;
pub mod playlist_fetcher;
pub mod query;
pub mod resolver;
pub mod stream_probe;
pub mod tmdb;
