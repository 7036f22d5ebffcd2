//! Error types for remote lookups and download dispatch.

use thiserror::Error;

/// Errors from the Last.fm client, download backends, and playlist
/// generation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An HTTP request to an external source failed.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    /// A response from an external source could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The Last.fm API returned an error payload.
    #[error("Last.fm API error: {0}")]
    Api(String),

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the core index layer.
    #[error("index error: {0}")]
    Core(#[from] reprise_core::Error),

    /// An I/O error from playlist or save-file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
