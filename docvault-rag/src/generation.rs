//! Generation provider trait for producing text from a language model.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that completes prompts with a language model.
///
/// Two modes are exposed: [`query`](GenerationProvider::query) for stateless
/// one-off completions, and [`chat`](GenerationProvider::chat) for turns that
/// accumulate conversation history on the provider instance.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete `prompt` without consulting or touching conversation
    /// history. Returns `Ok(None)` when the model produced no text.
    async fn query(&self, prompt: &str) -> Result<Option<String>>;

    /// Run one conversation turn: record `prompt` as a user message,
    /// complete against the accumulated history, and record the reply.
    ///
    /// Turns from concurrent callers interleave in lock-acquisition order,
    /// so callers wanting a coherent conversation serialize their turns.
    async fn chat(&self, prompt: &str) -> Result<Option<String>>;

    /// Drop the accumulated conversation history.
    async fn clear_history(&self);

    /// Wait until the provider's backing client is usable.
    ///
    /// Same contract as [`EmbeddingProvider::ready`](crate::embedding::EmbeddingProvider::ready);
    /// the default implementation returns immediately.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }
}
