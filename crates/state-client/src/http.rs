//! Retrying HTTP core shared by every state store operation.

use crate::error::StateStoreError;
use gramflow_resilience::{run_with_retry, CircuitBreaker, RetryPolicy};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the remote store.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub base_url: String,
    /// Bearer-style secret sent on every request.
    pub secret: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub breaker_threshold: u32,
    pub breaker_window: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            secret: String::new(),
            request_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            breaker_threshold: 5,
            breaker_window: Duration::from_secs(30),
        }
    }
}

/// reqwest wrapped in retry + circuit breaking.
///
/// This breaker guards the HTTP failure domain only; the browser layer has
/// its own. Unlike that one, an open breaker here fails fast — the runner
/// would rather degrade than stall on a dead store.
pub struct ResilientHttpClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, StateStoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| StateStoreError::Http(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret: config.secret,
            retry: config.retry,
            breaker: CircuitBreaker::new(config.breaker_threshold, config.breaker_window),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, StateStoreError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, StateStoreError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, StateStoreError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, StateStoreError> {
        if self.breaker.is_open() {
            return Err(StateStoreError::Unavailable(
                "http circuit breaker open".to_string(),
            ));
        }

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let result = run_with_retry(&self.retry, StateStoreError::is_transient, |attempt| {
            let method = method.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                debug!(%url, attempt, "state store request");
                self.send_once(method, &url, body).await
            }
        })
        .await;

        match &result {
            Ok(_) => self.breaker.record_success(),
            // 404 is an answer, not an outage.
            Err(err) if err.is_not_found() => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<Value, StateStoreError> {
        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.secret));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| StateStoreError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StateStoreError::Status {
                code: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|err| StateStoreError::Http(err.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| StateStoreError::Decode(err.to_string()))
    }
}
