//! Completion client trait for LLM API providers.

use crate::{ApiError, Turn, Usage};
use std::future::Future;
use std::pin::Pin;

/// One request to a completion client: a system prompt, the ordered turns,
/// and an output-token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub turns: Vec<Turn>,
    pub max_tokens: u32,
}

/// The generated text and the token usage reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// Trait for LLM API providers.
///
/// Dyn-compatible so a conversation can hold an `Arc<dyn CompletionClient>`
/// and tests can substitute a scripted client.
pub trait CompletionClient: Send + Sync {
    /// Send one non-streaming request and return the generated text.
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, ApiError>> + Send + 'a>>;

    /// Provider name for logging/display (e.g., "anthropic").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn client_is_dyn_compatible() {
        fn _accept(_c: &dyn CompletionClient) {}
    }

    #[test]
    fn arc_client_is_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Arc<dyn CompletionClient>>();
    }
}
