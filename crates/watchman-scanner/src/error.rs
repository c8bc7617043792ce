//! Error types for scanning and remediation.

use std::path::PathBuf;
use thiserror::Error;
use watchman_api::ApiError;
use watchman_signatures::SignatureError;
use watchman_slack::FetchError;

/// Errors raised by a scan run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Entity fetching failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An API call made by the scanner itself failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A signature could not be compiled
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The tombstone replacement text could not be read
    #[error("failed to read replacement text from {path}: {source}")]
    ReplacementText {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A notification could not be built or delivered
    #[error("failed to deliver notification: {0}")]
    Sink(String),

    /// Serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether this error should end the run rather than skip one item.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_fatal(),
            Self::Api(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
