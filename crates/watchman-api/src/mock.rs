//! Scripted transport for tests.
//!
//! Responses are queued per endpoint and served in order. When an endpoint's
//! queue is empty its handler, if any, answers instead; otherwise the call
//! gets an `unknown_method` error response. Every request is recorded.

use crate::error::{ApiError, Result};
use crate::request::ApiRequest;
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&ApiRequest) -> Value + Send + Sync>;

/// In-memory [`Transport`] with scripted responses.
#[derive(Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for an endpoint, served once each in order.
    pub fn script(&self, endpoint: &str, responses: Vec<Value>) {
        let mut queued = self.queued.lock().expect("mock queue lock");
        queued
            .entry(endpoint.to_string())
            .or_default()
            .extend(responses.into_iter().map(Ok));
    }

    /// Queue a transport failure for an endpoint.
    pub fn push_error(&self, endpoint: &str, error: ApiError) {
        let mut queued = self.queued.lock().expect("mock queue lock");
        queued
            .entry(endpoint.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Answer every otherwise unscripted call to `endpoint` with `handler`.
    pub fn on(
        &self,
        endpoint: &str,
        handler: impl Fn(&ApiRequest) -> Value + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .expect("mock handler lock")
            .insert(endpoint.to_string(), Box::new(handler));
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    /// Requests received for one endpoint.
    #[must_use]
    pub fn calls_to(&self, endpoint: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.endpoint == endpoint)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push(request.clone());

        let scripted = self
            .queued
            .lock()
            .expect("mock queue lock")
            .get_mut(&request.endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return response;
        }

        let handlers = self.handlers.lock().expect("mock handler lock");
        match handlers.get(&request.endpoint) {
            Some(handler) => Ok(handler(request)),
            None => Ok(json!({ "ok": false, "error": "unknown_method" })),
        }
    }
}
