//! Language model boundary
//!
//! Every model-backed step (clarify, brief, plan, reflect, compress, report)
//! talks to a [`LanguageModel`]: prompt in, text out. Structured steps then
//! pass the text through [`structured`], which turns it into a typed value or
//! a `SchemaViolation`.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Clarifier / Planner / ...    │
//! └──────────────┬───────────────┘
//!                │ complete(preamble, prompt)
//!                ▼
//! ┌──────────────────────────────┐
//! │ LanguageModel (trait)        │
//! └──────────────┬───────────────┘
//!                │ implemented by
//!                ▼
//! ┌──────────────────────────────┐
//! │ OllamaModel (Rig provider)   │
//! └──────────────────────────────┘
//! ```

mod ollama;
pub mod structured;

pub use ollama::OllamaModel;
pub use structured::{complete_structured, extract_json, parse_structured, Validate};

use async_trait::async_trait;

use crate::error::FactCheckError;

/// Prompt-in, text-out model capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion with a system preamble and a user prompt
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String, FactCheckError>;

    /// Provider/model name for logging
    fn name(&self) -> &str;
}
