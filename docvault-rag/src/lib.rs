//! # docvault-rag
//!
//! Local Retrieval-Augmented Generation over your own documents.
//!
//! ## Overview
//!
//! This crate turns text documents into chunked, embedded, persistently
//! indexed collections and answers queries from them:
//!
//! - [`RagPipeline`] - the orchestrator: ingest, search, generate, summarize
//! - [`SentenceSplitter`] - sentence/paragraph packing with overlap
//! - [`EmbeddingProvider`] / [`GenerationProvider`] - async model seams
//! - [`FileVectorStore`] - persistent JSON-file-per-collection storage
//! - [`InMemoryVectorStore`] - volatile storage for tests and demos
//! - [`ollama`] - providers speaking a local Ollama server's HTTP API
//!   (behind the `ollama` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docvault_rag::ollama::{OllamaEmbedder, OllamaGenerator};
//! use docvault_rag::{Document, FileVectorStore, RagConfig, RagPipeline};
//!
//! # async fn run() -> docvault_rag::Result<()> {
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().collection("notes").build()?)
//!     .embedding_provider(Arc::new(OllamaEmbedder::from_env()))
//!     .vector_store(Arc::new(FileVectorStore::new("data/.db")))
//!     .generation_provider(Arc::new(OllamaGenerator::from_env()))
//!     .build()?;
//!
//! pipeline.ingest(&[Document::new("Ops Runbook", "Rotate logs weekly. ...")]).await?;
//!
//! let titles = pipeline.search("log rotation").await?;
//! let answer = pipeline.generate("how often do we rotate logs?").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Retrieval-only deployments simply skip `generation_provider`; calling
//! [`RagPipeline::generate`] then fails with a configuration error while
//! ingestion and search keep working.

pub mod chunking;
pub mod config;
pub mod distance;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generation;
pub mod inmemory;
mod loading;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

pub use chunking::{SentenceSplitter, Splitter};
pub use config::{RagConfig, RagConfigBuilder};
pub use distance::DistanceFn;
pub use document::{CHUNK_INDEX_KEY, Document, TOTAL_CHUNKS_KEY};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filestore::{DEFAULT_DB_PATH, FileVectorStore};
pub use generation::GenerationProvider;
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use pipeline::{NO_DOCUMENTS_MESSAGE, NO_RESPONSE_MESSAGE, RagPipeline, RagPipelineBuilder};
pub use prompt::{PromptLibrary, RAG_CONTEXT, SUMMARIZE_TEXT};
pub use vectorstore::VectorStore;
