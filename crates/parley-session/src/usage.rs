//! Token usage and cost accounting.

use parley_types::Usage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-model pricing for cost estimation (USD per 1M tokens).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens.
    pub input_per_million: f64,
    /// Price per 1M output tokens.
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Estimate cost for given token counts.
    pub fn estimate_cost(&self, usage: &Usage) -> f64 {
        (usage.input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (usage.output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        // Mid-range estimate for models we don't know.
        Self::new(3.0, 15.0)
    }
}

/// Model families matched by substring when there is no exact entry.
const FAMILY_PRICES: &[(&str, ModelPricing)] = &[
    ("opus", ModelPricing::new(15.0, 75.0)),
    ("sonnet", ModelPricing::new(3.0, 15.0)),
    ("haiku", ModelPricing::new(0.80, 4.00)),
];

/// Immutable mapping from model identifier to pricing.
///
/// Lookup order: exact model id, then model family, then the fallback.
#[derive(Debug, Clone)]
pub struct PriceTable {
    models: HashMap<String, ModelPricing>,
    fallback: ModelPricing,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "claude-haiku-4-5-20251001".to_string(),
            ModelPricing::new(0.80, 4.00),
        );
        Self {
            models,
            fallback: ModelPricing::default(),
        }
    }
}

impl PriceTable {
    /// Built-in table with additional per-model entries layered on top.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (String, ModelPricing)>) -> Self {
        let mut table = Self::default();
        table.models.extend(overrides);
        table
    }

    /// Pricing for `model`.
    ///
    /// Family matching looks only at the segment after the last `/`, so a
    /// prefix like `"my-org/custom-sonnet"` still resolves by model name.
    pub fn for_model(&self, model: &str) -> ModelPricing {
        if let Some(pricing) = self.models.get(model) {
            return *pricing;
        }
        let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();
        FAMILY_PRICES
            .iter()
            .find(|(family, _)| name.contains(family))
            .map(|(_, pricing)| *pricing)
            .unwrap_or(self.fallback)
    }
}

/// Token, cost and request counts over some span of requests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub requests: u64,
}

/// Cumulative and most-recent-request usage for a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageLedger {
    pub total: UsageTotals,
    pub last: UsageTotals,
    pub compressions: u32,
}

/// Folds every completion call's usage into a [`UsageLedger`] at a fixed
/// price.
#[derive(Debug, Clone)]
pub struct UsageAccountant {
    pricing: ModelPricing,
    ledger: UsageLedger,
}

impl UsageAccountant {
    pub fn new(pricing: ModelPricing) -> Self {
        Self {
            pricing,
            ledger: UsageLedger::default(),
        }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Record one completed request. Returns its estimated cost.
    pub fn record(&mut self, usage: &Usage) -> f64 {
        let cost = self.pricing.estimate_cost(usage);
        self.ledger.last = UsageTotals {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_usd: cost,
            requests: 1,
        };

        let total = &mut self.ledger.total;
        total.input_tokens += usage.input_tokens;
        total.output_tokens += usage.output_tokens;
        total.cost_usd += cost;
        total.requests += 1;
        cost
    }

    /// Record the request that produced a new summary.
    pub fn record_compression(&mut self, usage: &Usage) -> f64 {
        self.ledger.compressions += 1;
        self.record(usage)
    }

    pub fn reset(&mut self) {
        self.ledger = UsageLedger::default();
    }
}
