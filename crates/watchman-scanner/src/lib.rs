//! Watchman Scanner - Signature matching, remediation and run orchestration.
//!
//! This crate evaluates fetched messages, files and drafts against every
//! enabled signature, enriches matches with user, workspace and conversation
//! context, and optionally replaces matched posts with a tombstone.
//!
//! # Architecture
//!
//! - **Engine** ([`engine`]): Partitioned parallel matching with a join barrier
//! - **Location** ([`location`]): Conversation gating by signature locations
//! - **Results** ([`result`]): Match records and permalinks
//! - **Dedup** ([`dedup`]): Canonical-form deduplication of merged worker output
//! - **Remediation** ([`remediation`]): Tombstoning of matched posts
//! - **Sink** ([`sink`]): Notification records and their destinations
//! - **Orchestrator** ([`orchestrator`]): One complete run over an enterprise
//!
//! # Example
//!
//! ```rust,no_run
//! use watchman_api::{ApiClient, SlackApi};
//! use watchman_core::{ApiConfig, ApiToken, Lookback};
//! use watchman_scanner::{RunOptions, TerminalSink, Watchman};
//! use watchman_signatures::{SignatureLoader, SignatureRegistry};
//! use watchman_slack::Fetcher;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SignatureRegistry::load_from(&SignatureLoader::new("signatures")?)?;
//! let client = ApiClient::from_config(&ApiConfig::default(), ApiToken::from_env()?)?;
//! let fetcher = Fetcher::new(SlackApi::new(client), Lookback::default().oldest(), 4);
//!
//! let summary = Watchman::new(fetcher, RunOptions::default())
//!     .run(&registry, &TerminalSink)
//!     .await?;
//! println!("{} results", summary.results);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod dedup;
pub mod engine;
pub mod error;
pub mod location;
pub mod orchestrator;
pub mod remediation;
pub mod result;
pub mod sink;

// Re-export commonly used types
pub use dedup::deduplicate;
pub use engine::{ScanContext, ScanEngine};
pub use error::{Result, ScanError};
pub use location::allowed;
pub use orchestrator::{RunOptions, RunSummary, Watchman};
pub use remediation::{load_replacement_text, RemediationDriver, RemediationReport};
pub use result::{permalink, MatchResult, MatchedPost};
pub use sink::{JsonSink, Notification, NotifyType, ResultSink, TerminalSink};
