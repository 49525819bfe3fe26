//! Unified error types for httpcache.
//!
//! Display strings carry a stable upper-case code prefix so the CLI and
//! logs can be grepped by failure class.

use std::path::PathBuf;

use tokio_rusqlite::rusqlite;

/// Unified error types for the cache core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A blob path was read that was never stored.
    #[error("BLOB_NOT_FOUND: {}", .0.display())]
    BlobNotFound(PathBuf),

    /// Filesystem operation on the blob root failed.
    #[error("BLOB_ERROR: {}: {source}", .path.display())]
    Blob {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transport could not produce a response and unreachable
    /// outcomes are not being cached.
    #[error("UNREACHABLE: {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The fetch was refused without a cacheable outcome.
    #[error("FETCH_REJECTED: {url}: {reason}")]
    FetchRejected { url: String, reason: String },

    /// A redirect chain revisited a URL or exceeded the depth bound.
    #[error("REDIRECT_LOOP: {url} (after {hops} hops)")]
    RedirectLoop { url: String, hops: usize },

    /// Insert conflicts kept recurring after every permitted restart.
    #[error("RACE_UNRESOLVED: {url} (after {attempts} attempts)")]
    RaceUnresolved { url: String, attempts: usize },
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
