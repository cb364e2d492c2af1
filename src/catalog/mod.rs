pub mod cached;
pub mod retry;
pub mod spotify;

#[cfg(test)]
pub(crate) mod fake;

use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheError;

pub use cached::CachedCatalog;
pub use retry::RetryPolicy;
pub use spotify::SpotifyClient;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed for {what}: {source}")]
    Http {
        what: String,
        #[source]
        source: ureq::Error,
    },
    #[error("Unexpected response for {what}: {message}")]
    Response { what: String, message: String },
    #[error("Malformed {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "Missing catalog credentials (set catalog.client_id/client_secret \
         or SPOTIPY_CLIENT_ID/SPOTIPY_CLIENT_SECRET)"
    )]
    MissingCredentials,
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    /// Whether retrying the same request could succeed: rate limits, server
    /// errors and network-level failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } => match source {
                ureq::Error::StatusCode(code) => *code == 429 || *code >= 500,
                ureq::Error::Io(_)
                | ureq::Error::Timeout(_)
                | ureq::Error::HostNotFound
                | ureq::Error::ConnectionFailed => true,
                _ => false,
            },
            _ => false,
        }
    }
}

/// The remote catalog service. Every call returns the raw JSON document so
/// it can be cached verbatim.
pub trait Catalog {
    fn album(&self, id: &str) -> Result<Value>;

    /// Features for each id, as one JSON array in request order. Unknown ids
    /// come back as `null` entries.
    fn audio_features(&self, track_ids: &[String]) -> Result<Value>;

    fn audio_analysis(&self, track_id: &str) -> Result<Value>;

    /// Raw bytes of an image (cover art).
    fn image(&self, url: &str) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(source: ureq::Error) -> CatalogError {
        CatalogError::Http {
            what: "album x".into(),
            source,
        }
    }

    #[test]
    fn test_transient_errors() {
        assert!(http(ureq::Error::StatusCode(429)).is_transient());
        assert!(http(ureq::Error::StatusCode(503)).is_transient());
        assert!(http(ureq::Error::ConnectionFailed).is_transient());
        assert!(!http(ureq::Error::StatusCode(404)).is_transient());
        assert!(!http(ureq::Error::StatusCode(401)).is_transient());
        assert!(!CatalogError::MissingCredentials.is_transient());
    }
}
