//! Single-shot background loading of provider clients.
//!
//! Providers own clients that are expensive to obtain (a model warmup, a
//! server handshake). [`ClientCell`] runs the load exactly once on a
//! background task started at construction; every caller of
//! [`get`](ClientCell::get) suspends until the load reaches a terminal
//! state. A failed load stays failed: later callers see the original error
//! instead of triggering a retry.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle of a lazily loaded client.
enum LoadState<T> {
    /// The background load task has not finished yet.
    Loading,
    /// The client is available.
    Ready(Arc<T>),
    /// The load failed; the message is replayed to every caller.
    Failed(String),
}

/// A cell holding a client that loads once in the background.
pub(crate) struct ClientCell<T> {
    rx: watch::Receiver<LoadState<T>>,
}

impl<T: Send + Sync + 'static> ClientCell<T> {
    /// Start `load` on a background task and return a cell tracking it.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn<F>(load: F) -> Self
    where
        F: Future<Output = std::result::Result<T, String>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(LoadState::Loading);
        tokio::spawn(async move {
            let state = match load.await {
                Ok(client) => LoadState::Ready(Arc::new(client)),
                Err(message) => LoadState::Failed(message),
            };
            // All receivers may already be gone; nothing to report then.
            let _ = tx.send(state);
        });
        Self { rx }
    }

    /// Wait for the load to finish and return the shared client.
    pub(crate) async fn get(&self) -> std::result::Result<Arc<T>, String> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|state| !matches!(state, LoadState::Loading))
            .await
            .map_err(|_| "client loading task was dropped before completing".to_string())?;
        match &*state {
            LoadState::Ready(client) => Ok(Arc::clone(client)),
            LoadState::Failed(message) => Err(message.clone()),
            // wait_for only yields terminal states.
            LoadState::Loading => Err("client loading did not complete".to_string()),
        }
    }
}
