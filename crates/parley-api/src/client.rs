//! Anthropic Messages API client.

use std::time::Duration;

use parley_types::{ApiError, ApiErrorResponse, CreateMessageRequest, CreateMessageResponse};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::retry::{RetryConfig, calculate_delay, is_retryable};

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set the retry configuration for transient errors (429, 529, 5xx, network).
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Send a non-streaming Messages API request and decode the response.
    pub async fn create_message(
        &self,
        request: &CreateMessageRequest,
    ) -> Result<CreateMessageResponse, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| ApiError::Transport("Invalid API key format".into()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let body = serde_json::to_string(request)
            .map_err(|e| ApiError::Transport(format!("Failed to serialize request: {e}")))?;

        let mut attempt = 0;
        loop {
            tracing::debug!(
                "POST {url} (attempt {}/{})",
                attempt + 1,
                self.retry_config.max_retries + 1
            );

            let err = match self.send_once(&url, &headers, &body).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !is_retryable(&err) || attempt >= self.retry_config.max_retries {
                return Err(err);
            }

            let retry_after = match &err {
                ApiError::Remote { retry_after_ms, .. } => *retry_after_ms,
                _ => None,
            };
            let delay = calculate_delay(&self.retry_config, attempt, retry_after);
            tracing::warn!(
                "Retryable API error (attempt {}/{}): {err}. Retrying in {delay}ms...",
                attempt + 1,
                self.retry_config.max_retries + 1,
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &str,
    ) -> Result<CreateMessageResponse, ApiError> {
        let response = self
            .http
            .post(url)
            .headers(headers.clone())
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text, retry_after));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Parse the `retry-after` header value as seconds and convert to milliseconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0) as u64)
}

/// Turn an HTTP error response into `ApiError::Remote`, keeping the raw body.
fn classify_error(status: u16, body: &str, retry_after: Option<u64>) -> ApiError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ApiErrorResponse>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.message)
        .unwrap_or_else(|| body.to_string());

    ApiError::Remote {
        status,
        message,
        body: body.to_string(),
        retry_after_ms: retry_after,
    }
}
