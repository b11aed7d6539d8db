//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing a [`Splitter`], an [`EmbeddingProvider`], a [`VectorStore`],
//! and an optional [`GenerationProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docvault_rag::{RagPipeline, RagConfig, FileVectorStore};
//! use docvault_rag::ollama::{OllamaEmbedder, OllamaGenerator};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OllamaEmbedder::from_env()))
//!     .vector_store(Arc::new(FileVectorStore::new("data/.db")))
//!     .generation_provider(Arc::new(OllamaGenerator::from_env()))
//!     .build()?;
//!
//! pipeline.ingest(&[document]).await?;
//! let titles = pipeline.search("how do I rotate the logs?").await?;
//! let answer = pipeline.generate("how do I rotate the logs?").await?;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::{SentenceSplitter, Splitter};
use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::prompt::{PromptLibrary, RAG_CONTEXT, SUMMARIZE_TEXT};
use crate::vectorstore::VectorStore;

/// Returned by [`RagPipeline::generate`] when retrieval found nothing to
/// ground an answer on. The generation provider is not consulted.
pub const NO_DOCUMENTS_MESSAGE: &str = "No documents found in the database.";

/// Returned by [`RagPipeline::generate`] and [`RagPipeline::summarize`] when
/// the generation provider produced no text.
pub const NO_RESPONSE_MESSAGE: &str = "No response from the model.";

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (split → embed → store) and retrieval
/// (embed → nearest neighbors → titles or a generated answer). Construct one
/// via [`RagPipeline::builder()`].
///
/// Operations that touch a provider suspend until that provider's background
/// load finishes; operations that only touch the vector store never wait on
/// providers.
pub struct RagPipeline {
    config: RagConfig,
    splitter: Arc<dyn Splitter>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    prompts: PromptLibrary,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Warm the pipeline up: acquire storage and wait for provider loading.
    ///
    /// Optional, since every operation initializes lazily, but calling it
    /// once up front surfaces storage and model-load failures early.
    pub async fn init(&self) -> Result<()> {
        self.vector_store.init().await?;
        self.embedding_provider.ready().await?;
        if let Some(generator) = &self.generation_provider {
            generator.ready().await?;
        }
        debug!(collection = %self.config.collection, "pipeline ready");
        Ok(())
    }

    /// Ingest documents into the configured collection.
    ///
    /// Each document is split, its chunk contents embedded as one batch, and
    /// the embedded chunks upserted in a single store call, so a document is
    /// ingested entirely or not at all. The first failing document aborts
    /// with its error; documents before it remain ingested and the caller
    /// decides whether to continue with the rest.
    ///
    /// Returns the total number of chunks stored.
    pub async fn ingest(&self, documents: &[Document]) -> Result<usize> {
        let mut stored = 0;
        for document in documents {
            // 1. Split the document into chunk documents
            let mut chunks = self.splitter.split(document);

            // 2. Embed all chunk contents as one batch
            let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedding_provider.embed(&texts).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                e
            })?;
            if embeddings.len() != chunks.len() {
                return Err(RagError::PipelineError(format!(
                    "embedder returned {} vectors for {} chunks of document '{}'",
                    embeddings.len(),
                    chunks.len(),
                    document.id
                )));
            }

            // 3. Attach embeddings to chunks
            for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
                chunk.embedding = Some(embedding);
            }

            // 4. Upsert this document's chunks in one call
            self.vector_store.add(&self.config.collection, &chunks).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
                e
            })?;

            let chunk_count = chunks.len();
            info!(document.id = %document.id, chunk_count, "ingested document");
            stored += chunk_count;
        }
        Ok(stored)
    }

    /// Search the configured collection.
    ///
    /// Embeds the query, fetches the `top_k` nearest chunks, and reduces
    /// them to deduplicated, lexicographically sorted document titles: the
    /// answer to "which documents are relevant", not raw chunk text.
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        debug!(query, "search");
        let retrieved = self.retrieve(query).await?;
        let titles: BTreeSet<String> = retrieved.into_iter().map(|chunk| chunk.title).collect();
        Ok(titles.into_iter().collect())
    }

    /// Answer a question grounded in the configured collection.
    ///
    /// Embeds the query, fetches the `top_k` nearest chunks, joins their
    /// contents in rank order, and asks the generation provider to answer
    /// from that context. When retrieval comes back empty the fixed
    /// [`NO_DOCUMENTS_MESSAGE`] is returned without invoking the provider;
    /// when the provider returns no text the result is
    /// [`NO_RESPONSE_MESSAGE`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the pipeline was built without a
    /// generation provider.
    pub async fn generate(&self, query: &str) -> Result<String> {
        let generator = self.generator()?;

        debug!(query, "generate");

        // 1. Retrieve grounding chunks
        let retrieved = self.retrieve(query).await?;
        if retrieved.is_empty() {
            info!(collection = %self.config.collection, "no chunks retrieved, skipping generation");
            return Ok(NO_DOCUMENTS_MESSAGE.to_string());
        }

        // 2. Assemble the context in retrieval-rank order
        let context =
            retrieved.iter().map(|chunk| chunk.content.as_str()).collect::<Vec<_>>().join("\n");

        // 3. Render the prompt and generate
        let prompt =
            self.prompts.render(RAG_CONTEXT, &[("question", query), ("context", &context)])?;
        let answer = generator.query(&prompt).await.map_err(|e| {
            error!(error = %e, "generation failed");
            e
        })?;

        Ok(answer.unwrap_or_else(|| NO_RESPONSE_MESSAGE.to_string()))
    }

    /// Summarize arbitrary text with the generation provider.
    ///
    /// Renders the summarization prompt and asks the provider directly; the
    /// vector store and embedding provider are not involved. A provider that
    /// returns no text yields [`NO_RESPONSE_MESSAGE`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the pipeline was built without a
    /// generation provider.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let generator = self.generator()?;

        debug!(text_len = text.len(), "summarize");

        let prompt = self.prompts.render(SUMMARIZE_TEXT, &[("text", text)])?;
        let summary = generator.query(&prompt).await.map_err(|e| {
            error!(error = %e, "summarization failed");
            e
        })?;

        Ok(summary.unwrap_or_else(|| NO_RESPONSE_MESSAGE.to_string()))
    }

    /// Return every chunk stored in the configured collection.
    ///
    /// A pure storage operation: never waits on provider loading.
    pub async fn list_all(&self) -> Result<Vec<Document>> {
        self.vector_store.list(&self.config.collection).await
    }

    /// Delete the configured collection and everything in it.
    ///
    /// A pure storage operation: never waits on provider loading.
    pub async fn delete_all(&self) -> Result<()> {
        info!(collection = %self.config.collection, "deleting all documents");
        self.vector_store.delete_all(&self.config.collection).await
    }

    /// Embed `query` and fetch its `top_k` nearest chunks.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let embeddings = self.embedding_provider.embed(&[query]).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;
        let Some(embedding) = embeddings.first() else {
            return Err(RagError::PipelineError(
                "embedder returned no vector for the query".to_string(),
            ));
        };
        self.vector_store.query(&self.config.collection, embedding, self.config.top_k).await
    }

    fn generator(&self) -> Result<&Arc<dyn GenerationProvider>> {
        self.generation_provider.as_ref().ok_or_else(|| {
            RagError::ConfigError("pipeline was built without a generation provider".to_string())
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider and vector store are required. The configuration
/// defaults to [`RagConfig::default()`], the splitter to a
/// [`SentenceSplitter`] over the configuration's chunk geometry, the prompt
/// library to [`PromptLibrary::default()`], and the generation provider to
/// none (retrieval-only pipeline).
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generation_provider(Arc::new(generator))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    splitter: Option<Arc<dyn Splitter>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    prompts: Option<PromptLibrary>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document splitter, overriding the configuration-derived
    /// [`SentenceSplitter`].
    pub fn splitter(mut self, splitter: Arc<dyn Splitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    /// Set the generation provider enabling [`RagPipeline::generate`] and
    /// [`RagPipeline::summarize`].
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the prompt library.
    pub fn prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Build the [`RagPipeline`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider or the
    /// vector store is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let splitter: Arc<dyn Splitter> = match self.splitter {
            Some(splitter) => splitter,
            None => Arc::new(SentenceSplitter::new(config.chunk_size, config.chunk_overlap)),
        };

        Ok(RagPipeline {
            config,
            splitter,
            embedding_provider,
            vector_store,
            generation_provider: self.generation_provider,
            prompts: self.prompts.unwrap_or_default(),
        })
    }
}
