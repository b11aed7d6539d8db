//! The document type shared by whole documents and their chunks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key holding a chunk's zero-based position within its parent document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the total number of chunks split from the parent document.
pub const TOTAL_CHUNKS_KEY: &str = "total_chunks";

/// A text document, or a chunk derived from one.
///
/// The same type flows through the whole pipeline: callers hand whole
/// documents to [`RagPipeline::ingest`](crate::pipeline::RagPipeline::ingest),
/// the splitter derives chunk documents from them, the embedding provider
/// fills in `embedding`, and the vector store persists the result. Chunks are
/// distinguished only by their id scheme (`{parent_id}_{chunk_index}`) and
/// the [`CHUNK_INDEX_KEY`] / [`TOTAL_CHUNKS_KEY`] metadata entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// Human-readable label, inherited unchanged by derived chunks.
    pub title: String,
    /// The text content.
    pub content: String,
    /// Key-value metadata. Chunks inherit the parent's entries and add their
    /// position fields as stringified integers.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Vector embedding, `None` until an embedding provider sets it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Creation timestamp, copied verbatim onto derived chunks.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp, copied verbatim onto derived chunks.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with a generated id, current timestamps, and no
    /// metadata.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            metadata: HashMap::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the generated id with a stable external one.
    ///
    /// Chunk ids derive from the document id, so re-ingesting a document
    /// under the same id overwrites its previous chunks instead of
    /// duplicating them.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = Document::new("A", "alpha");
        let b = Document::new("B", "beta");
        assert_ne!(a.id, b.id);
        assert!(a.metadata.is_empty());
        assert!(a.embedding.is_none());
    }

    #[test]
    fn builders_override_id_and_metadata() {
        let doc = Document::new("Notes", "contents")
            .with_id("notes-1")
            .with_metadata("source", "notes.txt");
        assert_eq!(doc.id, "notes-1");
        assert_eq!(doc.metadata.get("source").map(String::as_str), Some("notes.txt"));
    }

    #[test]
    fn serde_round_trip_keeps_fields() {
        let doc = Document::new("Notes", "contents").with_metadata("k", "v");
        let json = serde_json::to_string(&doc).unwrap();
        // Absent embeddings are omitted from the wire form entirely.
        assert!(!json.contains("embedding"));
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
