//! History persistence, usage accounting and context compression for Parley.

pub mod compact;
pub mod error;
pub mod store;
pub mod types;
pub mod usage;

pub use compact::{Compaction, Compressor};
pub use error::StoreError;
pub use store::{DECODERS, Decoder, HistoryStore, decode};
pub use types::PersistedState;
pub use usage::{ModelPricing, PriceTable, UsageAccountant, UsageLedger, UsageTotals};
