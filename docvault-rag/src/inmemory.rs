//! In-memory vector store.
//!
//! This module provides [`InMemoryVectorStore`], a volatile store backed by
//! a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and small corpora that fit comfortably in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::distance::DistanceFn;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank, without_embedding};

/// A volatile [`VectorStore`] holding collections in process memory.
///
/// Entries keep insertion order so ranking ties resolve the same way the
/// persistent store resolves them. All operations are async-safe via
/// `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add("docs", &chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    distance: DistanceFn,
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store using cosine distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store whose collections rank with `distance`.
    pub fn with_distance(distance: DistanceFn) -> Self {
        Self { distance, collections: RwLock::new(HashMap::new()) }
    }
}

fn store_error(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: "memory".to_string(), message: message.into() }
}

/// Reject the batch unless every document carries an embedding of the
/// collection's dimensionality.
fn check_batch(entries: &[Document], documents: &[Document]) -> Result<()> {
    let mut dimensions = entries.first().and_then(|e| e.embedding.as_ref()).map(Vec::len);
    for document in documents {
        let embedding = document
            .embedding
            .as_ref()
            .ok_or_else(|| store_error(format!("document '{}' has no embedding", document.id)))?;
        match dimensions {
            Some(width) if embedding.len() != width => {
                return Err(store_error(format!(
                    "document '{}' has a {}-dimensional embedding, expected {width}",
                    document.id,
                    embedding.len()
                )));
            }
            None => dimensions = Some(embedding.len()),
            _ => {}
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn add(&self, collection: &str, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        check_batch(entries, documents)?;
        for document in documents {
            match entries.iter_mut().find(|existing| existing.id == document.id) {
                Some(slot) => *slot = document.clone(),
                None => entries.push(document.clone()),
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(rank(entries, embedding, k, self.distance))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(entries.iter().map(without_embedding).collect())
    }

    async fn delete_all(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Document {
        let mut doc = Document::new(id.to_uppercase(), format!("content of {id}")).with_id(id);
        doc.embedding = Some(embedding);
        doc
    }

    #[tokio::test]
    async fn add_then_query_ranks_by_distance() {
        let store = InMemoryVectorStore::new();
        store
            .add("docs", &[chunk("far", vec![0.1, 0.9]), chunk("near", vec![0.9, 0.1])])
            .await
            .unwrap();

        let results = store.query("docs", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].id, "near");
        assert_eq!(results[1].id, "far");
        assert!(results[0].embedding.is_none());
    }

    #[tokio::test]
    async fn query_missing_collection_is_empty() {
        let store = InMemoryVectorStore::new();
        assert!(store.query("nope", &[1.0], 5).await.unwrap().is_empty());
        assert!(store.list("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites_in_place() {
        let store = InMemoryVectorStore::new();
        store
            .add("docs", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let mut replacement = chunk("a", vec![0.5, 0.5]);
        replacement.content = "updated".to_string();
        store.add("docs", &[replacement]).await.unwrap();

        let listed = store.list("docs").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "a");
        assert_eq!(listed[0].content, "updated");
        assert_eq!(listed[1].id, "b");
    }

    #[tokio::test]
    async fn missing_embedding_is_rejected() {
        let store = InMemoryVectorStore::new();
        let bare = Document::new("Bare", "no vector");
        let err = store.add("docs", &[bare]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected_atomically() {
        let store = InMemoryVectorStore::new();
        store.add("docs", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .add("docs", &[chunk("b", vec![0.0, 1.0]), chunk("c", vec![1.0, 2.0, 3.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        // The valid half of the failed batch is not written either.
        assert_eq!(store.list("docs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_all_removes_the_collection() {
        let store = InMemoryVectorStore::new();
        store.add("docs", &[chunk("a", vec![1.0])]).await.unwrap();
        store.delete_all("docs").await.unwrap();
        assert!(store.list("docs").await.unwrap().is_empty());
        // Absent collections delete quietly.
        store.delete_all("docs").await.unwrap();
    }
}
