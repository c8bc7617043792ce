//! Paginated API client with rate-limit recovery.
//!
//! [`ApiClient::call`] returns the raw pages of a response. Each page request
//! goes through the recovery loop:
//!
//! - `missing_scope` fails immediately with the scope the server named
//! - `ratelimited` sleeps for the cooldown and resends the same request, a
//!   bounded number of times
//! - `channel_not_found` is retried once without the `team` parameter
//! - network failures are retried with a linear backoff
//! - any other error code is returned as [`ApiError::Api`]

use crate::error::{ApiError, Result};
use crate::request::{ApiRequest, HttpMethod, Params};
use crate::transport::{HttpTransport, Transport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use watchman_core::{ApiConfig, ApiToken};

/// Pagination style of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paginate {
    /// Single page
    None,
    /// Follow the `offset` cursor through the `offset` parameter
    Offset,
    /// Follow the `offset` cursor through the `latest` high-water mark
    Latest,
}

impl Paginate {
    fn cursor_param(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Offset => Some("offset"),
            Self::Latest => Some("latest"),
        }
    }
}

/// Retry and paging limits.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Sleep after a `ratelimited` response
    pub rate_limit_cooldown: Duration,
    /// Cooldowns allowed per request before giving up
    pub max_rate_limit_retries: u32,
    /// Network retries allowed per request
    pub max_transport_retries: u32,
    /// Base delay between network retries, multiplied by the attempt number
    pub transport_retry_delay: Duration,
    /// Value of the `limit` parameter when the caller sets none
    pub page_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_transport_retries: config.max_transport_retries,
            transport_retry_delay: Duration::from_millis(config.transport_retry_delay_ms),
            page_limit: config.page_limit,
        }
    }
}

/// Client for the discovery API.
///
/// Cloning is cheap; every clone shares the underlying transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ApiClient {
    /// Create a client over any transport with the default policy.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
        }
    }

    /// Create an HTTP client from API settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &ApiConfig, token: ApiToken) -> Result<Self> {
        let transport = HttpTransport::new(config, token)?;
        Ok(Self::new(Arc::new(transport)).with_policy(RetryPolicy::from(config)))
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `endpoint` and return every page of the response.
    ///
    /// # Errors
    /// Returns the first unrecoverable error of any page; pages fetched
    /// before it are discarded.
    pub async fn call(
        &self,
        endpoint: &str,
        mut params: Params,
        method: HttpMethod,
        paginate: Paginate,
    ) -> Result<Vec<Value>> {
        if !params.contains("limit") {
            params.set("limit", self.policy.page_limit);
        }

        let first = self.request(endpoint, &mut params, method).await?;
        let mut cursor = next_cursor(&first);
        let mut pages = vec![first];

        if let Some(param) = paginate.cursor_param() {
            while let Some(next) = cursor.take() {
                if params.get(param) == Some(next.as_str()) {
                    warn!(endpoint, cursor = %next, "server repeated pagination cursor, stopping");
                    break;
                }

                params.set(param, &next);
                let page = self.request(endpoint, &mut params, method).await?;
                cursor = next_cursor(&page);
                pages.push(page);
            }
        }

        debug!(endpoint, pages = pages.len(), "fetched pages");
        Ok(pages)
    }

    /// Send one page request, recovering from the conditions the API allows.
    async fn request(
        &self,
        endpoint: &str,
        params: &mut Params,
        method: HttpMethod,
    ) -> Result<Value> {
        let mut cooldowns = 0;
        let mut transport_failures = 0;
        let mut team_cleared = false;

        loop {
            let request = ApiRequest {
                method,
                endpoint: endpoint.to_string(),
                params: params.clone(),
            };

            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(e) if e.is_transient() && transport_failures < self.policy.max_transport_retries => {
                    transport_failures += 1;
                    let delay = self.policy.transport_retry_delay * transport_failures;
                    warn!(
                        "Request to {} failed (attempt {}/{}), retrying in {:?}: {}",
                        endpoint,
                        transport_failures,
                        self.policy.max_transport_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if response.get("ok").and_then(Value::as_bool) == Some(true) {
                return Ok(response);
            }

            let code = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");

            match code {
                "missing_scope" => {
                    return Err(ApiError::MissingScope {
                        endpoint: endpoint.to_string(),
                        needed: response
                            .get("needed")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                    });
                }
                "ratelimited" => {
                    if cooldowns >= self.policy.max_rate_limit_retries {
                        return Err(ApiError::RateLimited {
                            endpoint: endpoint.to_string(),
                            attempts: cooldowns + 1,
                        });
                    }
                    cooldowns += 1;
                    warn!(
                        endpoint,
                        attempt = cooldowns,
                        cooldown_secs = self.policy.rate_limit_cooldown.as_secs(),
                        "rate limited, cooling down"
                    );
                    tokio::time::sleep(self.policy.rate_limit_cooldown).await;
                }
                "channel_not_found" if !team_cleared && params.contains("team") => {
                    team_cleared = true;
                    params.remove("team");
                    debug!(endpoint, "channel not found with team scoping, retrying without it");
                }
                "channel_not_found" => {
                    return Err(ApiError::NotFound {
                        endpoint: endpoint.to_string(),
                        error: code.to_string(),
                    });
                }
                other => {
                    return Err(ApiError::Api {
                        endpoint: endpoint.to_string(),
                        error: other.to_string(),
                    });
                }
            }
        }
    }
}

/// Pagination cursor of a page, if the server reported one.
fn next_cursor(page: &Value) -> Option<String> {
    match page.get("offset")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
