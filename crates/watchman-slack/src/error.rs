//! Error types for entity fetching.

use thiserror::Error;
use watchman_api::ApiError;

/// Errors raised while fetching and materializing entities.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An API call failed after the client's own recovery
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A record required to continue could not be parsed
    #[error("malformed {kind} record {id}: {reason}")]
    Malformed {
        /// Entity kind, e.g. `conversation`
        kind: &'static str,
        /// Identifier the record was requested by
        id: String,
        /// Parse failure
        reason: String,
    },
}

impl FetchError {
    /// Whether this error should end the run rather than skip one item.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_fatal())
    }
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
