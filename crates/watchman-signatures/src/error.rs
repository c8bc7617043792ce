//! Error types for the signature subsystem.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in signature operations.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Signature not found in the registry
    #[error("signature not found: {name}")]
    NotFound {
        /// The signature name that was not found
        name: String,
    },

    /// Failed to read a signature file
    #[error("failed to load signature from {path}: {source}")]
    LoadError {
        /// Path to the signature file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a signature file
    #[error("failed to parse signature in {path}: {source}")]
    ParseError {
        /// Path to the signature file
        path: String,
        /// YAML or TOML parse error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The confirmation pattern does not compile
    #[error("invalid pattern for signature {signature}: {source}")]
    InvalidPattern {
        /// Signature name
        signature: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// Invalid signature (validation failed)
    #[error("invalid signature {signature}: {reason}")]
    ValidationError {
        /// Signature name
        signature: String,
        /// Reason for validation failure
        reason: String,
    },

    /// An embedded test case disagrees with the pattern
    #[error("self-test failed for signature {signature}: {case:?} should {expectation}")]
    SelfTestFailed {
        /// Signature name
        signature: String,
        /// The offending test case
        case: String,
        /// What the case was declared to do
        expectation: Expectation,
    },

    /// Signature directory not found
    #[error("signatures directory not found at {path}")]
    DirectoryNotFound {
        /// Expected directory path
        path: String,
    },

    /// Several files failed to load
    #[error("{} signature files failed to load", .failures.len())]
    Aggregate {
        /// Every failure, in path order
        failures: Vec<LoadFailure>,
    },

    /// I/O error while walking the signature tree
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared outcome of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Listed under `match_cases`
    Match,
    /// Listed under `fail_cases`
    NoMatch,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("match"),
            Self::NoMatch => f.write_str("not match"),
        }
    }
}

/// A file that could not be turned into a usable signature.
#[derive(Debug)]
pub struct LoadFailure {
    /// File that failed
    pub path: PathBuf,
    /// What went wrong
    pub error: SignatureError,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Result type for signature operations.
pub type Result<T> = std::result::Result<T, SignatureError>;
