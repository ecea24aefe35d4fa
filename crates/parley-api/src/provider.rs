//! Anthropic Messages API provider implementation.

use crate::client::ApiClient;
use crate::retry::RetryConfig;
use parley_types::{
    ApiError, Completion, CompletionClient, CompletionRequest, CreateMessageRequest,
};
use std::future::Future;
use std::pin::Pin;

/// Anthropic Messages API provider bound to one model.
///
/// Wraps `ApiClient` and implements `CompletionClient`. Retry logic stays in
/// `ApiClient`.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: ApiClient,
    model: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(api_key, base_url)?,
            model: model.into(),
        })
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.client = self.client.with_retry_config(config);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: (!request.system.is_empty()).then(|| request.system.clone()),
            messages: request.turns.clone(),
        }
    }
}

impl CompletionClient for AnthropicProvider {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.client.create_message(&self.build_request(request)).await?;
            let text = response.text().ok_or(ApiError::EmptyResponse)?;
            tracing::debug!(
                "{} replied: {} in / {} out tokens",
                self.model,
                response.usage.input_tokens,
                response.usage.output_tokens
            );
            Ok(Completion {
                text,
                usage: response.usage,
            })
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
