//! Shared types and error hierarchy for Parley.

pub mod error;
pub mod message;
pub mod provider;

pub use error::{ApiError, ConfigError, ParleyError};
pub use message::*;
pub use provider::{Completion, CompletionClient, CompletionRequest};
