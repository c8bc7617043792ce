//! Watchman API - Paginated, rate-limit aware client for the discovery API.
//!
//! # Architecture
//!
//! - **Requests** ([`request`]): Endpoint, method and parameter types
//! - **Transport** ([`transport`]): The HTTP seam, with a reqwest implementation
//! - **Client** ([`client`]): Pagination, rate-limit cooldown and error taxonomy
//! - **Endpoints** ([`slack`]): Typed wrappers for the discovery endpoints
//! - **Errors** ([`error`]): API error types
//!
//! # Example
//!
//! ```rust,no_run
//! use watchman_api::{ApiClient, SlackApi};
//! use watchman_core::{ApiConfig, ApiToken};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::from_config(&ApiConfig::default(), ApiToken::from_env()?)?;
//! let api = SlackApi::new(client);
//!
//! let enterprise = api.enterprise_info().await?;
//! println!("{}", enterprise["name"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod request;
pub mod slack;
pub mod transport;

// Re-export commonly used types
pub use client::{ApiClient, Paginate, RetryPolicy};
pub use error::{ApiError, Result};
pub use request::{ApiRequest, HttpMethod, Params};
pub use slack::{ConversationFilter, SlackApi};
pub use transport::{HttpTransport, Transport};
