//! Error types for document retrieval.
//!
//! Only byte sources produce typed errors. The ingestion pipeline turns
//! every [`SourceError`] into "no blocks for this document" and logs it;
//! nothing here ever reaches a search caller.

use std::time::Duration;

use thiserror::Error;

/// Why a document's text could not be obtained.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("no document registered for '{0}'")]
    Missing(String),
}
