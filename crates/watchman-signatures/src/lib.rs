//! Watchman Signatures - Declarative detection rules for Slack Watchman.
//!
//! This crate loads signature files from a directory tree, validates them,
//! runs their embedded test cases and indexes the enabled set for the scan
//! engine.
//!
//! # Architecture
//!
//! - **Definition Types** ([`definition`]): Signature metadata, scopes, locations and the compiled matcher
//! - **Loader** ([`loader`]): YAML/TOML loading from the `signatures/` directory
//! - **Registry** ([`registry`]): Ordered, immutable index with scope queries
//! - **Errors** ([`error`]): Signature-specific error types
//!
//! # Example
//!
//! ```rust,no_run
//! use watchman_signatures::{Scope, SignatureLoader, SignatureRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SignatureLoader::new("signatures")?;
//! let registry = SignatureRegistry::load_from(&loader)?;
//!
//! for signature in registry.for_scope(Scope::Messages) {
//!     println!("{} (severity {})", signature.name(), signature.severity());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export commonly used types
pub use definition::{
    CompiledSignature, Location, Scope, Signature, SignatureMeta, TestCases, BLANK_CASE,
};
pub use error::{Expectation, LoadFailure, Result, SignatureError};
pub use loader::{LoadReport, SignatureLoader, SANDBOX_DIR};
pub use registry::SignatureRegistry;
pub use watchman_core::LoadPolicy;
