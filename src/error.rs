//! Error taxonomy of the ingestion pipeline
//!
//! Only playlist retrieval failures abort a refresh. Resolution failures are
//! per-candidate (see `services::tmdb::ResolutionError`) and a missing stream is
//! an empty list, not an error.

use thiserror::Error;

/// Transport-level failure retrieving the playlist
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("playlist too large: {size_mb:.1}MB (limit {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: usize },
}

impl FetchError {
    pub fn status(status: reqwest::StatusCode) -> Self {
        let reason = match status {
            reqwest::StatusCode::NOT_FOUND => "playlist not found, check PLAYLIST_URL".to_string(),
            reqwest::StatusCode::FORBIDDEN => "access denied, the link may require authentication".to_string(),
            reqwest::StatusCode::TOO_MANY_REQUESTS => "rate limited by the playlist host".to_string(),
            _ => status.canonical_reason().unwrap_or("error").to_string(),
        };
        FetchError::Status {
            status: status.as_u16(),
            reason,
        }
    }
}

/// The source answered, but not with a playlist (typically an HTML page)
#[derive(Debug, Error)]
#[error("unrecognized playlist content: {0}")]
pub struct FormatError(pub String);

/// Failure of a whole refresh cycle
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("failed to fetch playlist: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl PlaylistError {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            PlaylistError::Fetch(_) => "fetch_error",
            PlaylistError::Format(_) => "format_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        let err = FetchError::status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP 404: playlist not found, check PLAYLIST_URL");

        let err = FetchError::status(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_playlist_error_labels() {
        let fetch: PlaylistError = FetchError::status(reqwest::StatusCode::NOT_FOUND).into();
        assert_eq!(fetch.label(), "fetch_error");
        let format: PlaylistError = FormatError("html".into()).into();
        assert_eq!(format.label(), "format_error");
        assert_eq!(format.to_string(), "unrecognized playlist content: html");
    }
}
