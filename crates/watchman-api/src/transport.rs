//! HTTP transport seam.
//!
//! A [`Transport`] sends exactly one request and returns the decoded JSON
//! body. Interpreting `ok`/`error`, retrying and paginating are the client's
//! job.

use crate::error::{ApiError, Result};
use crate::request::{ApiRequest, HttpMethod};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use watchman_core::{ApiConfig, ApiToken};

/// Sends a single API request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the decoded response body.
    async fn send(&self, request: &ApiRequest) -> Result<Value>;
}

/// reqwest-backed transport with bearer authentication.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: ApiToken,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a transport from API settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &ApiConfig, token: ApiToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_send_error(&self, endpoint: &str, error: &reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                endpoint: endpoint.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            ApiError::Network {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, request.endpoint);

        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url).query(&request.params),
            HttpMethod::Post => self.client.post(&url).form(&request.params),
        };

        let response = builder
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.endpoint, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(&request.endpoint, &e))?;

        match serde_json::from_str::<Value>(&body) {
            Ok(value) if value.is_object() => Ok(value),
            _ if status == StatusCode::TOO_MANY_REQUESTS => {
                Ok(json!({ "ok": false, "error": "ratelimited" }))
            }
            Ok(_) => Err(ApiError::MalformedResponse {
                endpoint: request.endpoint.clone(),
                message: format!("HTTP {status}: body is not a JSON object"),
            }),
            Err(e) => Err(ApiError::MalformedResponse {
                endpoint: request.endpoint.clone(),
                message: format!("HTTP {status}: {e}"),
            }),
        }
    }
}
