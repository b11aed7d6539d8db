//! Vector store trait for storing and searching embedded chunks.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::distance::DistanceFn;
use crate::document::Document;
use crate::error::Result;

/// A storage backend for embedded chunk documents.
///
/// Implementations manage named collections of chunk [`Document`]s and
/// support upserting, listing, deleting, and nearest-neighbor search. A
/// collection is created implicitly by its first write and keeps the
/// distance function it was created with for its whole life, even when the
/// store is later reopened with a different one configured.
///
/// Read paths are forgiving: querying or listing a collection that does not
/// exist yields an empty result, and a persistent backend that cannot read
/// its own data degrades to empty rather than failing the operation. Write
/// paths propagate their failures.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("data/.db");
/// store.add("docs", &chunks).await?;
/// let nearest = store.query("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Acquire the underlying storage.
    ///
    /// Idempotent, and optional: every other operation initializes lazily.
    /// Calling it up front surfaces storage problems early.
    async fn init(&self) -> Result<()>;

    /// Upsert chunk documents into `collection`, creating the collection
    /// (with the store's configured distance function) if absent.
    ///
    /// Every document must carry an embedding, and embeddings must match
    /// the dimensionality fixed by the collection's first write. A document
    /// whose id already exists is overwritten in place, keeping its
    /// position. The batch is validated as a whole before anything is
    /// written.
    async fn add(&self, collection: &str, documents: &[Document]) -> Result<()>;

    /// Return up to `k` chunks ranked best-first under the collection's
    /// distance function, ties broken by insertion order.
    ///
    /// Returned documents omit the stored embedding payload.
    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Document>>;

    /// Return every chunk in `collection` in insertion order, embeddings
    /// omitted.
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Destroy `collection` and everything in it. Deleting an absent
    /// collection is a no-op; later writes re-create it lazily.
    async fn delete_all(&self, collection: &str) -> Result<()>;
}

/// Rank `entries` best-first under `distance`, keeping at most `k`.
///
/// The sort is stable, so entries at equal distance keep their insertion
/// order. Returned documents have their embedding stripped.
pub(crate) fn rank(
    entries: &[Document],
    embedding: &[f32],
    k: usize,
    distance: DistanceFn,
) -> Vec<Document> {
    let mut scored: Vec<(f32, &Document)> = entries
        .iter()
        .map(|entry| {
            let d = entry
                .embedding
                .as_deref()
                .map(|stored| distance.distance(stored, embedding))
                .unwrap_or(f32::INFINITY);
            (d, entry)
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .map(|(_, entry)| without_embedding(entry))
        .collect()
}

/// A read-path copy of a stored chunk: everything but the vector.
pub(crate) fn without_embedding(document: &Document) -> Document {
    let mut document = document.clone();
    document.embedding = None;
    document
}
