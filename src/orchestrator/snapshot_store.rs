//! Holder of the active model snapshot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::ml::Snapshot;

/// The one piece of shared mutable state: readers clone the current `Arc`,
/// a retrain replaces it with a single pointer swap.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
    generation: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
            generation: AtomicU64::new(1),
        }
    }

    /// Snapshot to use for the whole of one request
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Replace the active snapshot, returning the one it superseded
    pub async fn publish(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let next = Arc::new(snapshot);
        let model_id = next.id();
        let previous = {
            let mut guard = self.current.write().await;
            guard.replace(next)
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            %model_id,
            generation,
            previous_model_id = ?previous.as_ref().map(|s| s.id()),
            "Published model snapshot"
        );
        previous
    }

    /// Number of snapshots published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }
}
