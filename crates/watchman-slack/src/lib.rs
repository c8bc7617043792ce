//! Watchman Slack - Entity models and fetchers for an Enterprise Grid.
//!
//! # Architecture
//!
//! - **Models** ([`models`]): Typed, null-tolerant entities parsed from raw records
//! - **Blocks** ([`blocks`]): Block Kit trees and text extraction
//! - **Fetcher** ([`fetcher`]): Time-windowed, pool-parallel entity fetching
//! - **Errors** ([`error`]): Fetch error types
//!
//! # Example
//!
//! ```rust,no_run
//! use watchman_api::{ApiClient, SlackApi};
//! use watchman_core::{ApiConfig, ApiToken, Lookback};
//! use watchman_slack::Fetcher;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::from_config(&ApiConfig::default(), ApiToken::from_env()?)?;
//! let fetcher = Fetcher::new(SlackApi::new(client), Lookback::default().oldest(), 4);
//!
//! let workspaces = fetcher.workspaces().await?;
//! let drafts = fetcher.drafts(&workspaces).await?;
//! println!("{} drafts in {} workspaces", drafts.len(), workspaces.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod blocks;
pub mod error;
pub mod fetcher;
pub mod models;

// Re-export commonly used types
pub use blocks::{text_leaves, BlockNode, BlockText};
pub use error::{FetchError, Result};
pub use fetcher::Fetcher;
pub use models::{
    Conversation, ConversationKind, Draft, Enterprise, File, Message, User, Workspace,
};
