//! Watchman Core - Foundation crate for Slack Watchman.
//!
//! This crate provides the configuration layer, credential handling, time-window
//! arithmetic and the partitioned worker pool that the other Watchman crates
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared types (`ApiToken`, `Lookback`) and timestamp helpers
//! - [`pool`] - Partitioning and the fan-in worker pool
//!
//! # Example
//!
//! ```rust
//! use watchman_core::{pool, AppConfig, Lookback};
//!
//! let config = AppConfig::default();
//! let cores = pool::resolve_cores(config.scanning.cores, pool::detected_cores());
//! assert!(cores >= 1);
//!
//! let lookback = Lookback::from_parts(Some(2), None);
//! assert_eq!(lookback.minutes(), 120);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod pool;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, LoadPolicy, ScanningConfig, SignaturesConfig};
pub use error::{ConfigError, ConfigResult};
pub use pool::{PoolOutcome, WorkerFailure};
pub use types::{ApiToken, Lookback, TOKEN_ENV_VAR};
