//! Retrain coordinator: rebuilds the code table and model together and
//! publishes them as one snapshot

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::data::{Dataset, ForecastError, ForecastResult, OrderSource};
use crate::ml::{train_snapshot, Metrics, Snapshot, TrainingConfig};

use super::snapshot_store::SnapshotStore;

#[derive(Debug, Clone)]
pub struct RetrainSettings {
    pub training: TrainingConfig,
    /// Upper bound on one fit; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Where the published snapshot is persisted, if anywhere
    pub artifact_path: Option<PathBuf>,
}

impl Default for RetrainSettings {
    fn default() -> Self {
        Self {
            training: TrainingConfig::default(),
            timeout: Some(Duration::from_secs(300)),
            artifact_path: None,
        }
    }
}

type CancelSlot = StdMutex<Option<watch::Sender<bool>>>;

fn lock_slot(slot: &CancelSlot) -> MutexGuard<'_, Option<watch::Sender<bool>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of the retrain in flight. Clears the cancel slot however the
/// retrain ends, including when its future is dropped mid-way.
struct ActiveRetrain<'a> {
    slot: &'a CancelSlot,
}

impl<'a> ActiveRetrain<'a> {
    fn register(slot: &'a CancelSlot, cancel_tx: watch::Sender<bool>) -> Self {
        *lock_slot(slot) = Some(cancel_tx);
        Self { slot }
    }
}

impl Drop for ActiveRetrain<'_> {
    fn drop(&mut self) {
        *lock_slot(self.slot) = None;
    }
}

/// A finished fit together with the gate it ran under
struct Trained {
    snapshot: Snapshot,
    metrics: Metrics,
    gate: OwnedMutexGuard<()>,
}

pub struct RetrainCoordinator {
    source: Arc<dyn OrderSource>,
    store: Arc<SnapshotStore>,
    settings: RetrainSettings,
    // Held by the fit itself, so an abandoned fit still blocks the next retrain
    gate: Arc<Mutex<()>>,
    active: CancelSlot,
}

impl RetrainCoordinator {
    pub fn new(source: Arc<dyn OrderSource>, store: Arc<SnapshotStore>, settings: RetrainSettings) -> Self {
        Self {
            source,
            store,
            settings,
            gate: Arc::new(Mutex::new(())),
            active: StdMutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn settings(&self) -> &RetrainSettings {
        &self.settings
    }

    /// A fit is running, possibly one whose caller already gave up on it
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Fetch the current order history and retrain on it
    pub async fn retrain_from_source(&self) -> ForecastResult<Metrics> {
        let rows = self.source.fetch_orders().await?;
        let dataset = Dataset::from_rows(rows)?;
        self.retrain(dataset).await
    }

    /// Train on `dataset` and publish the result. Nothing is published when
    /// training fails, times out or is cancelled.
    pub async fn retrain(&self, dataset: Dataset) -> ForecastResult<Metrics> {
        if dataset.is_empty() {
            return Err(ForecastError::training_error("dataset is empty"));
        }

        let gate = self.gate.clone().lock_owned().await;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let active = ActiveRetrain::register(&self.active, cancel_tx);

        let started = Instant::now();
        info!(rows = dataset.len(), "Retrain started");

        let outcome = self.run_training(dataset, gate, cancel_rx).await;
        drop(active);

        let Trained { snapshot, metrics, gate: _gate } = match outcome {
            Ok(trained) => trained,
            Err(e) => {
                error!(error = %e, "Retrain failed");
                return Err(e);
            }
        };

        if let Some(path) = &self.settings.artifact_path {
            snapshot.persist(path).await?;
        }
        self.store.publish(snapshot).await;

        info!(
            rmse = metrics.rmse,
            r2_score = metrics.r2_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrain completed"
        );
        Ok(metrics)
    }

    async fn run_training(
        &self,
        dataset: Dataset,
        gate: OwnedMutexGuard<()>,
        mut cancelled: watch::Receiver<bool>,
    ) -> ForecastResult<Trained> {
        let config = self.settings.training;
        // The gate travels with the fit: a timed-out or cancelled fit runs to
        // completion on the blocking pool and only then lets the next one start.
        let fit = tokio::task::spawn_blocking(move || (train_snapshot(&dataset, &config), gate));

        let bounded = async {
            let joined = match self.settings.timeout {
                Some(limit) => tokio::time::timeout(limit, fit).await.map_err(|_| {
                    warn!(seconds = limit.as_secs(), "Retrain timed out");
                    ForecastError::TrainingTimeout {
                        seconds: limit.as_secs(),
                    }
                })?,
                None => fit.await,
            };
            let (trained, gate) =
                joined.map_err(|e| ForecastError::Internal(format!("training task failed: {}", e)))?;
            let (snapshot, metrics) = trained?;
            Ok::<_, ForecastError>(Trained { snapshot, metrics, gate })
        };

        tokio::select! {
            biased;
            Ok(_) = cancelled.wait_for(|flag| *flag) => {
                warn!("Retrain cancelled");
                Err(ForecastError::TrainingCancelled)
            }
            result = bounded => result,
        }
    }

    /// Cancel the retrain in flight, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        match lock_slot(&self.active).as_ref() {
            Some(cancel_tx) => {
                cancel_tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Use a snapshot persisted by an earlier run, if one is configured and valid
    pub async fn load_persisted(&self) -> ForecastResult<bool> {
        let Some(path) = &self.settings.artifact_path else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let path = path.clone();
        let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&path))
            .await
            .map_err(|e| ForecastError::Internal(format!("snapshot load task failed: {}", e)))??;
        self.store.publish(snapshot).await;
        Ok(true)
    }
}
