//! Persistent vector store backed by JSON files.
//!
//! This module provides [`FileVectorStore`], the default storage engine: one
//! JSON file per collection under a root directory, loaded lazily into
//! memory on first use and rewritten on every mutation. It needs no server
//! process and keeps the on-disk format inspectable with standard tools.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::distance::DistanceFn;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank, without_embedding};

/// Default on-disk location for the store's root directory.
pub const DEFAULT_DB_PATH: &str = "data/.db";

/// In-memory image of one collection file.
///
/// The `name` recorded inside the file is authoritative, so a file renamed
/// on disk still loads under the collection it was created as.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    name: String,
    /// Distance token pinned when the collection was created.
    distance: DistanceFn,
    /// Embedding width fixed by the first write, `None` until then.
    #[serde(default)]
    dimensions: Option<usize>,
    documents: Vec<Document>,
}

impl Collection {
    fn new(name: &str, distance: DistanceFn) -> Self {
        Self { name: name.to_string(), distance, dimensions: None, documents: Vec::new() }
    }
}

/// A persistent [`VectorStore`] keeping each collection in its own JSON file.
///
/// The whole store loads into memory on first use; reads are served from
/// memory and every mutation rewrites the affected collection's file.
/// Collections remember the distance function they were created with, even
/// when the store is reopened with a different one configured.
///
/// Collection names are mapped to file names by replacing characters outside
/// `[A-Za-z0-9._-]` with `_`, so two names sharing a sanitized form share a
/// file; the last one written wins on reload.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("data/.db");
/// store.add("docs", &chunks).await?;
/// let nearest = store.query("docs", &query_embedding, 10).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    root: PathBuf,
    distance: DistanceFn,
    state: RwLock<Option<HashMap<String, Collection>>>,
}

impl FileVectorStore {
    /// Create a store rooted at `root`, using cosine distance for new
    /// collections. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_distance(root, DistanceFn::default())
    }

    /// Create a store rooted at `root` whose new collections use `distance`.
    pub fn with_distance(root: impl Into<PathBuf>, distance: DistanceFn) -> Self {
        Self { root: root.into(), distance, state: RwLock::new(None) }
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        let keep = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
        let sanitized: String = name.chars().map(|c| if keep(c) { c } else { '_' }).collect();
        self.root.join(format!("{sanitized}.json"))
    }

    /// Load every collection file under the root into memory, once.
    ///
    /// A missing root directory is a fresh store. Files that cannot be read
    /// or parsed are skipped with a warning so one corrupt collection does
    /// not take down the rest.
    async fn ensure_loaded(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.is_some() {
                return Ok(());
            }
        }

        let mut state = self.state.write().await;
        if state.is_some() {
            return Ok(());
        }

        let mut collections = HashMap::new();
        match tokio::fs::read_dir(&self.root).await {
            Ok(mut dir) => loop {
                let entry = dir.next_entry().await.map_err(|e| {
                    store_error(format!("failed to scan {}: {e}", self.root.display()))
                })?;
                let Some(entry) = entry else { break };
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                match read_collection(&path).await {
                    Ok(collection) => {
                        collections.insert(collection.name.clone(), collection);
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "skipping unreadable collection file"
                        );
                    }
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(store_error(format!("failed to open {}: {e}", self.root.display())));
            }
        }

        debug!(root = %self.root.display(), collections = collections.len(), "vector store loaded");
        *state = Some(collections);
        Ok(())
    }

    /// Rewrite one collection's file.
    async fn flush(&self, collection: &Collection) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| store_error(format!("failed to create {}: {e}", self.root.display())))?;
        let path = self.collection_path(&collection.name);
        let bytes = serde_json::to_vec(collection).map_err(|e| {
            store_error(format!("failed to encode collection '{}': {e}", collection.name))
        })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| store_error(format!("failed to write {}: {e}", path.display())))
    }
}

async fn read_collection(path: &Path) -> Result<Collection> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| store_error(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| store_error(format!("failed to parse {}: {e}", path.display())))
}

fn store_error(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: "file".to_string(), message: message.into() }
}

/// Reject the batch unless every document carries an embedding matching the
/// collection's dimensionality. Returns the width the collection ends up
/// with.
fn check_batch(collection: &Collection, documents: &[Document]) -> Result<Option<usize>> {
    let mut dimensions = collection.dimensions;
    for document in documents {
        let embedding = document
            .embedding
            .as_ref()
            .ok_or_else(|| store_error(format!("document '{}' has no embedding", document.id)))?;
        match dimensions {
            Some(width) if embedding.len() != width => {
                return Err(store_error(format!(
                    "document '{}' has a {}-dimensional embedding, collection '{}' expects {width}",
                    document.id,
                    embedding.len(),
                    collection.name
                )));
            }
            None => dimensions = Some(embedding.len()),
            _ => {}
        }
    }
    Ok(dimensions)
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn init(&self) -> Result<()> {
        self.ensure_loaded().await
    }

    async fn add(&self, collection: &str, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        self.ensure_loaded().await?;

        let mut state = self.state.write().await;
        let Some(collections) = state.as_mut() else {
            return Err(store_error("store state missing after initialization"));
        };
        let entry = collections.entry(collection.to_string()).or_insert_with(|| {
            info!(collection, distance = self.distance.as_token(), "creating collection");
            Collection::new(collection, self.distance)
        });

        entry.dimensions = check_batch(entry, documents)?;
        for document in documents {
            match entry.documents.iter_mut().find(|existing| existing.id == document.id) {
                Some(slot) => *slot = document.clone(),
                None => entry.documents.push(document.clone()),
            }
        }

        self.flush(entry).await?;
        debug!(collection, count = documents.len(), "upserted chunks");
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Document>> {
        if let Err(e) = self.ensure_loaded().await {
            warn!(collection, error = %e, "query degraded to empty result");
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        let Some(entry) = state.as_ref().and_then(|c| c.get(collection)) else {
            debug!(collection, "collection not found");
            return Ok(Vec::new());
        };
        Ok(rank(&entry.documents, embedding, k, entry.distance))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        if let Err(e) = self.ensure_loaded().await {
            warn!(collection, error = %e, "list degraded to empty result");
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        let Some(entry) = state.as_ref().and_then(|c| c.get(collection)) else {
            return Ok(Vec::new());
        };
        Ok(entry.documents.iter().map(without_embedding).collect())
    }

    async fn delete_all(&self, collection: &str) -> Result<()> {
        self.ensure_loaded().await?;

        let mut state = self.state.write().await;
        let Some(collections) = state.as_mut() else {
            return Err(store_error("store state missing after initialization"));
        };
        if collections.remove(collection).is_none() {
            return Ok(());
        }

        let path = self.collection_path(collection);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(store_error(format!("failed to remove {}: {e}", path.display()))),
        }
        info!(collection, "deleted collection");
        Ok(())
    }
}
