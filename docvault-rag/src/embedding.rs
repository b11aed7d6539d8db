//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The batch is the unit of work: the pipeline embeds all chunks
/// of a document in one call, so backends with native batching get it for
/// free.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embeddings = provider.embed(&["hello", "world"]).await?;
/// assert_eq!(embeddings.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// Returns one vector per input, in input order. An empty batch yields
    /// an empty result without touching the backend. All vectors from one
    /// provider have the same dimensionality.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Wait until the provider's backing client is usable.
    ///
    /// Providers that load a client in the background resolve once loading
    /// reaches a terminal state, replaying the load error if it failed.
    /// The default implementation returns immediately.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }
}
