//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
///
/// There are no hidden globals: whichever collection, chunking geometry, and
/// retrieval depth a pipeline uses is whatever was passed at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagConfig {
    /// Name of the collection operations read from and write to.
    pub collection: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { collection: "default".to_string(), chunk_size: 512, chunk_overlap: 100, top_k: 10 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the collection operations target.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `collection` is empty
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.collection.is_empty() {
            return Err(RagError::ConfigError("collection name must not be empty".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.collection, "default");
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 10);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = RagConfig::builder()
            .collection("notes")
            .chunk_size(256)
            .chunk_overlap(32)
            .top_k(5)
            .build()
            .unwrap();
        assert_eq!(config.collection, "notes");
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 32);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(RagConfig::builder().collection("").build().is_err());
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }
}
