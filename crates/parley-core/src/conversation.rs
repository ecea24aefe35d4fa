//! The conversation orchestrator: window management, prompt assembly,
//! usage accounting and persistence around a completion client.

use parley_session::{
    Compressor, HistoryStore, ModelPricing, PersistedState, UsageAccountant, UsageLedger,
};
use parley_types::{CompletionClient, CompletionRequest, ParleyError, Turn};
use std::sync::Arc;

/// Separator between the base system prompt and the running summary.
const SUMMARY_HEADER: &str = "\n\nSummary of the previous dialogue:\n";

/// Tunables for a [`Conversation`].
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub system_prompt: String,
    /// Output budget for each reply.
    pub max_tokens: u32,
    /// Output budget for each summary.
    pub summary_max_tokens: u32,
    /// Turns kept verbatim after compression. Values below 1 act as 1.
    pub keep_last: usize,
    /// Compression runs once the turn count exceeds this.
    pub compress_at: usize,
}

/// The result of a successful [`Conversation::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Whether older turns were folded into the summary during this call.
    pub compressed: bool,
}

/// A single multi-turn dialogue with a bounded context window.
///
/// Owns the summary and the active turns; the optional [`HistoryStore`] only
/// mirrors them. Calls take `&mut self`, so one conversation is driven by one
/// caller at a time.
pub struct Conversation {
    client: Arc<dyn CompletionClient>,
    compressor: Compressor,
    accountant: UsageAccountant,
    store: Option<HistoryStore>,
    system_prompt: String,
    max_tokens: u32,
    compress_at: usize,
    summary: String,
    turns: Vec<Turn>,
    compressed_last: bool,
}

impl Conversation {
    /// Create an empty, in-memory conversation.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        config: ConversationConfig,
        pricing: ModelPricing,
    ) -> Self {
        Self {
            client,
            compressor: Compressor::new(config.keep_last, config.summary_max_tokens),
            accountant: UsageAccountant::new(pricing),
            store: None,
            system_prompt: config.system_prompt,
            max_tokens: config.max_tokens,
            compress_at: config.compress_at,
            summary: String::new(),
            turns: Vec::new(),
            compressed_last: false,
        }
    }

    /// Attach a history store and restore whatever it holds.
    ///
    /// Unreadable or corrupt history is logged and replaced by an empty
    /// conversation.
    pub async fn with_store(mut self, store: HistoryStore) -> Self {
        match store.load().await {
            Ok(Some(state)) => {
                tracing::info!(
                    "Loaded {} turns from {}",
                    state.history.len(),
                    store.path().display()
                );
                self.summary = state.summary;
                self.turns = state.history;
            }
            Ok(None) => {
                tracing::debug!("No history at {}", store.path().display());
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable history at {}: {e}",
                    store.path().display()
                );
            }
        }
        self.store = Some(store);
        self
    }

    /// Send a user message and return the model's reply.
    ///
    /// The user turn is appended first and stays in memory even if a later
    /// step fails. If the window overflows, older turns are summarized
    /// before the reply request is sent.
    pub async fn submit(&mut self, text: &str) -> Result<Reply, ParleyError> {
        self.compressed_last = false;
        self.turns.push(Turn::user(text));

        if self.turns.len() > self.compress_at {
            self.compress().await?;
        }

        let request = CompletionRequest {
            system: self.system_text(),
            turns: self.turns.clone(),
            max_tokens: self.max_tokens,
        };
        let completion = self.client.complete(&request).await?;

        let cost = self.accountant.record(&completion.usage);
        tracing::debug!(
            "Reply: {} in / {} out tokens, ${cost:.6}",
            completion.usage.input_tokens,
            completion.usage.output_tokens
        );
        self.turns.push(Turn::assistant(completion.text.clone()));
        self.persist().await;

        Ok(Reply {
            text: completion.text,
            compressed: self.compressed_last,
        })
    }

    /// Fold everything but the last `keep_last` turns into the summary.
    ///
    /// Nothing changes unless the summarization request succeeds.
    async fn compress(&mut self) -> Result<(), ParleyError> {
        let compaction = self
            .compressor
            .compress(self.client.as_ref(), &self.summary, &self.turns)
            .await
            .map_err(ParleyError::Compression)?;

        if let Some(compaction) = compaction {
            self.accountant.record_compression(&compaction.usage);
            self.summary = compaction.summary;
            self.turns.drain(..compaction.folded);
            self.compressed_last = true;
            tracing::info!(
                "Compressed {} turns into summary ({} kept)",
                compaction.folded,
                self.turns.len()
            );
        }
        Ok(())
    }

    /// Clear summary, turns and usage, and delete any stored history.
    pub async fn reset(&mut self) {
        self.summary.clear();
        self.turns.clear();
        self.accountant.reset();
        self.compressed_last = false;
        if let Some(store) = &self.store {
            if let Err(e) = store.delete().await {
                tracing::warn!(
                    "Failed to delete history at {}: {e}",
                    store.path().display()
                );
            }
        }
    }

    /// System prompt for the next request: the base prompt plus the summary.
    pub fn system_text(&self) -> String {
        if self.summary.is_empty() {
            return self.system_prompt.clone();
        }
        format!("{}{SUMMARY_HEADER}{}", self.system_prompt, self.summary)
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn usage(&self) -> &UsageLedger {
        self.accountant.ledger()
    }

    /// Whether the most recent `submit` compressed the window.
    pub fn compressed_last(&self) -> bool {
        self.compressed_last
    }

    /// Save the current state. Failures are logged, never returned.
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let state = PersistedState::new(self.summary.clone(), self.turns.clone());
        if let Err(e) = store.save(&state).await {
            tracing::warn!(
                "Failed to save history to {}: {e}",
                store.path().display()
            );
        }
    }
}
