//! Completion client port trait
//!
//! The reply interpreter talks to the language model through this interface.
//! Prompt design and response validation live in the application layer.

use async_trait::async_trait;

use crate::error::LlmError;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a system instruction and a user prompt, returning the raw text the
    /// model produced. The model is asked to answer with a single JSON object.
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}
