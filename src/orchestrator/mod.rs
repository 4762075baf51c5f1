//! Serving-side coordination: the active snapshot, predictions against it,
//! and retrains that replace it

pub mod prediction;
pub mod retrain;
pub mod snapshot_store;

pub use prediction::{PredictionDetails, PredictionResult, PredictionService};
pub use retrain::{RetrainCoordinator, RetrainSettings};
pub use snapshot_store::SnapshotStore;
