//! Error types surfaced by the client operations.

use thiserror::Error;

pub use crate::fetch::FetchError;

/// Error type for all client operations.
///
/// Fetch-layer failures propagate unmodified after retries are exhausted;
/// extraction gaps never surface here. They degrade to absent or default
/// fields on the assembled record.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP fetch failed (fatal status, or the retry budget was spent).
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// A JSON response body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
