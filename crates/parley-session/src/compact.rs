//! Context compression: fold old turns into a model-written summary.

use parley_types::{ApiError, CompletionClient, CompletionRequest, Turn, Usage};

/// System instruction for the summarization request.
const SUMMARIZER_PROMPT: &str = "You summarize dialogues. \
    Compress the dialogue into a brief summary of 3-5 sentences. \
    Preserve key facts, names and decisions. \
    Return ONLY the summary.";

/// Default number of recent turns kept verbatim.
pub const DEFAULT_KEEP_LAST: usize = 4;

/// Default output budget for a summary.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 300;

/// A finished compression, not yet applied to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compaction {
    /// Replacement summary. Already incorporates the previous one.
    pub summary: String,
    /// Number of leading turns the summary now stands in for.
    pub folded: usize,
    /// Usage of the summarization request.
    pub usage: Usage,
}

/// Summarizes everything but the last `keep_last` turns.
#[derive(Debug, Clone)]
pub struct Compressor {
    keep_last: usize,
    max_tokens: u32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_LAST, DEFAULT_SUMMARY_MAX_TOKENS)
    }
}

impl Compressor {
    /// `keep_last` is raised to 1 so the newest turn always survives.
    pub fn new(keep_last: usize, max_tokens: u32) -> Self {
        Self {
            keep_last: keep_last.max(1),
            max_tokens,
        }
    }

    /// Index of the first surviving turn, or `None` if nothing would be folded.
    pub fn cutoff(&self, turn_count: usize) -> Option<usize> {
        turn_count
            .checked_sub(self.keep_last)
            .filter(|&cutoff| cutoff > 0)
    }

    /// Build the summarization request for `folded` turns.
    pub fn build_request(&self, summary: &str, folded: &[Turn]) -> CompletionRequest {
        let mut text = String::new();
        if !summary.is_empty() {
            text.push_str("Previous summary:\n");
            text.push_str(summary);
            text.push_str("\n\n");
        }
        text.push_str("New messages to summarize:\n");
        for turn in folded {
            text.push_str(turn.role.label());
            text.push_str(": ");
            text.push_str(&turn.content);
            text.push('\n');
        }

        CompletionRequest {
            system: SUMMARIZER_PROMPT.to_string(),
            turns: vec![Turn::user(text)],
            max_tokens: self.max_tokens,
        }
    }

    /// Summarize the prefix of `turns` that falls outside the kept window.
    ///
    /// Makes at most one client call and never touches the caller's state;
    /// `Ok(None)` means there was nothing to fold.
    pub async fn compress(
        &self,
        client: &dyn CompletionClient,
        summary: &str,
        turns: &[Turn],
    ) -> Result<Option<Compaction>, ApiError> {
        let Some(cutoff) = self.cutoff(turns.len()) else {
            return Ok(None);
        };

        let request = self.build_request(summary, &turns[..cutoff]);
        tracing::debug!(
            "Summarizing {cutoff} turns via {} (keeping {})",
            client.name(),
            turns.len() - cutoff
        );
        let completion = client.complete(&request).await?;

        Ok(Some(Compaction {
            summary: completion.text,
            folded: cutoff,
            usage: completion.usage,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::Completion;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Answers every request with a fixed result and remembers the requests.
    struct FixedClient {
        result: Result<&'static str, u16>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedClient {
        fn ok(text: &'static str) -> Self {
            Self {
                result: Ok(text),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                result: Err(status),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for FixedClient {
        fn complete<'a>(
            &'a self,
            request: &'a CompletionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Completion, ApiError>> + Send + 'a>> {
            self.seen.lock().unwrap().push(request.clone());
            let result = match self.result {
                Ok(text) => Ok(Completion {
                    text: text.to_string(),
                    usage: Usage::new(50, 20),
                }),
                Err(status) => Err(ApiError::Remote {
                    status,
                    message: "boom".into(),
                    body: String::new(),
                    retry_after_ms: None,
                }),
            };
            Box::pin(async move { result })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn dialogue(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("Question {i}"))
                } else {
                    Turn::assistant(format!("Answer {i}"))
                }
            })
            .collect()
    }

    #[test]
    fn cutoff_is_none_until_window_overflows() {
        let compressor = Compressor::new(2, 300);
        assert_eq!(compressor.cutoff(0), None);
        assert_eq!(compressor.cutoff(2), None);
        assert_eq!(compressor.cutoff(3), Some(1));
        assert_eq!(compressor.cutoff(5), Some(3));
    }

    #[test]
    fn zero_keep_last_still_keeps_newest_turn() {
        let compressor = Compressor::new(0, 300);
        assert_eq!(compressor.cutoff(1), None);
        assert_eq!(compressor.cutoff(3), Some(2));
    }

    #[test]
    fn request_without_previous_summary() {
        let compressor = Compressor::new(2, 300);
        let request = compressor.build_request("", &dialogue(2));
        assert_eq!(request.max_tokens, 300);
        assert_eq!(request.system, SUMMARIZER_PROMPT);
        assert_eq!(request.turns.len(), 1);
        assert_eq!(
            request.turns[0].content,
            "New messages to summarize:\nUser: Question 0\nAssistant: Answer 1\n"
        );
    }

    #[test]
    fn request_includes_previous_summary() {
        let compressor = Compressor::default();
        let request = compressor.build_request("Carol is planning a trip.", &dialogue(1));
        assert_eq!(
            request.turns[0].content,
            "Previous summary:\nCarol is planning a trip.\n\n\
             New messages to summarize:\nUser: Question 0\n"
        );
    }

    #[tokio::test]
    async fn compress_folds_prefix() {
        let client = FixedClient::ok("They talked about questions.");
        let compressor = Compressor::new(2, 300);
        let turns = dialogue(5);

        let compaction = compressor
            .compress(&client, "", &turns)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(compaction.folded, 3);
        assert_eq!(compaction.summary, "They talked about questions.");
        assert_eq!(compaction.usage, Usage::new(50, 20));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].turns[0].content.contains("Question 2"));
        assert!(!seen[0].turns[0].content.contains("Answer 3"));
    }

    #[tokio::test]
    async fn compress_is_noop_when_keep_last_covers_everything() {
        let client = FixedClient::ok("unused");
        let compressor = Compressor::new(6, 300);
        let result = compressor.compress(&client, "", &dialogue(5)).await.unwrap();
        assert!(result.is_none());
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn compress_propagates_client_error() {
        let client = FixedClient::failing(500);
        let compressor = Compressor::new(1, 300);
        let err = compressor
            .compress(&client, "old", &dialogue(3))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
