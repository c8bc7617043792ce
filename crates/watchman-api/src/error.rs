//! Error types for the API client.

use thiserror::Error;

/// Errors that can occur while talking to the discovery API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The token lacks an OAuth scope the endpoint needs
    #[error("missing OAuth scope for {endpoint}: {needed}")]
    MissingScope {
        /// Endpoint that rejected the call
        endpoint: String,
        /// Scope named by the server
        needed: String,
    },

    /// Still rate limited after every allowed cooldown
    #[error("rate limited on {endpoint} after {attempts} attempts")]
    RateLimited {
        /// Endpoint being called
        endpoint: String,
        /// Number of requests sent
        attempts: u32,
    },

    /// The conversation could not be found, even without team scoping
    #[error("{endpoint} could not find the resource: {error}")]
    NotFound {
        /// Endpoint being called
        endpoint: String,
        /// Upstream error code
        error: String,
    },

    /// Any other non-ok response
    #[error("API error on {endpoint}: {error}")]
    Api {
        /// Endpoint being called
        endpoint: String,
        /// Upstream error code
        error: String,
    },

    /// Network failure before a response arrived
    #[error("network error calling {endpoint}: {message}")]
    Network {
        /// Endpoint being called
        endpoint: String,
        /// Error message
        message: String,
    },

    /// The per-call timeout elapsed
    #[error("request to {endpoint} timed out after {seconds}s")]
    Timeout {
        /// Endpoint being called
        endpoint: String,
        /// Timeout duration in seconds
        seconds: u64,
    },

    /// The response body was not the JSON object we expected
    #[error("malformed response from {endpoint}: {message}")]
    MalformedResponse {
        /// Endpoint being called
        endpoint: String,
        /// What was wrong with it
        message: String,
    },

    /// HTTP client construction failed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Errors that end the run no matter where they occur.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingScope { .. })
    }

    /// Errors worth retrying with a short backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::MissingScope {
            endpoint: "discovery.users.list".to_string(),
            needed: "discovery:read".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing OAuth scope for discovery.users.list: discovery:read"
        );
        assert!(err.is_fatal());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let err = ApiError::Timeout {
            endpoint: "team.info".to_string(),
            seconds: 30,
        };
        assert!(err.is_transient());

        let err = ApiError::Api {
            endpoint: "team.info".to_string(),
            error: "invalid_auth".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_fatal());
    }
}
