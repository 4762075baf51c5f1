//! Machine learning core: feature encoding, category codes, the decision tree
//! artifact and the training pipeline

pub mod codes;
pub mod features;
pub mod model;
pub mod training;

pub use codes::{CategoryCodeTable, CodeLookup, DEFAULT_CODE};
pub use features::{EncodedFeatures, FeatureEncoder, FeatureInput, FeatureSchema};
pub use model::{Metrics, ModelArtifact, Snapshot, TreeParams};
pub use training::{train_snapshot, TrainingConfig};

use crate::data::ForecastResult;

/// Trait for ML model predictions
pub trait Predictor {
    type Input;
    type Output;

    fn predict(&self, input: &Self::Input) -> ForecastResult<Self::Output>;
}
