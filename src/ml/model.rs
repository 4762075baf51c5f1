//! Model artifact and the snapshot pairing it with its code table

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::{ForecastError, ForecastResult};

use super::codes::CategoryCodeTable;
use super::features::{EncodedFeatures, FeatureSchema, FEATURE_COUNT};
use super::Predictor;

pub type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Decision tree hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows the tree until leaves are pure
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl TreeParams {
    fn to_smartcore(self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            seed: Some(self.seed),
        }
    }
}

/// Held-out scores of a training run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub r2_score: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Trained regressor plus the feature contract it was trained against
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    pub id: Uuid,
    pub schema: FeatureSchema,
    pub trained_at: DateTime<Utc>,
    pub params: TreeParams,
    pub metrics: Metrics,
    /// Fingerprint of the code table the training vectors were encoded with
    pub codes_fingerprint: String,
    tree: Tree,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("id", &self.id)
            .field("schema", &self.schema)
            .field("trained_at", &self.trained_at)
            .field("params", &self.params)
            .field("metrics", &self.metrics)
            .field("codes_fingerprint", &self.codes_fingerprint)
            .finish_non_exhaustive()
    }
}

fn to_matrix(rows: &[[f64; FEATURE_COUNT]]) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
}

/// Fit a regression tree on encoded rows
pub fn fit_tree(
    features: &[[f64; FEATURE_COUNT]],
    targets: &[f64],
    params: TreeParams,
) -> ForecastResult<Tree> {
    if features.is_empty() || features.len() != targets.len() {
        return Err(ForecastError::training_error(format!(
            "cannot fit on {} feature rows and {} targets",
            features.len(),
            targets.len()
        )));
    }

    let x = to_matrix(features);
    let y = targets.to_vec();
    DecisionTreeRegressor::fit(&x, &y, params.to_smartcore())
        .map_err(|e| ForecastError::Model(e.to_string()))
}

impl ModelArtifact {
    pub fn new(tree: Tree, params: TreeParams, metrics: Metrics, codes: &CategoryCodeTable) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema: FeatureSchema::current(),
            trained_at: Utc::now(),
            params,
            metrics,
            codes_fingerprint: codes.fingerprint(),
            tree,
        }
    }

    pub fn with_metrics(self, metrics: Metrics) -> Self {
        Self { metrics, ..self }
    }

    /// Predict a batch of encoded rows
    pub fn predict_rows(&self, rows: &[[f64; FEATURE_COUNT]]) -> ForecastResult<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.tree
            .predict(&to_matrix(rows))
            .map_err(|e| ForecastError::Model(e.to_string()))
    }
}

impl Predictor for ModelArtifact {
    type Input = EncodedFeatures;
    type Output = f64;

    fn predict(&self, input: &EncodedFeatures) -> ForecastResult<f64> {
        self.predict_rows(&[input.values])?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Model("empty prediction".to_string()))
    }
}

/// Immutable (artifact, code table) pair published and persisted as one unit
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    artifact: ModelArtifact,
    codes: CategoryCodeTable,
}

impl Snapshot {
    /// Pair an artifact with its table, refusing a table it was not trained with
    pub fn new(artifact: ModelArtifact, codes: CategoryCodeTable) -> ForecastResult<Self> {
        let snapshot = Self { artifact, codes };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn codes(&self) -> &CategoryCodeTable {
        &self.codes
    }

    pub fn id(&self) -> Uuid {
        self.artifact.id
    }

    /// The code table is the one the artifact was trained with
    pub fn is_consistent(&self) -> bool {
        self.artifact.codes_fingerprint == self.codes.fingerprint()
    }

    fn validate(&self) -> ForecastResult<()> {
        FeatureSchema::current().ensure_matches(&self.artifact.schema)?;
        if !self.is_consistent() {
            return Err(ForecastError::SchemaMismatch {
                expected: format!("code table {}", self.artifact.codes_fingerprint),
                found: format!("code table {}", self.codes.fingerprint()),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> ForecastResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a persisted snapshot and check it against the current schema
    pub fn from_bytes(bytes: &[u8]) -> ForecastResult<Self> {
        let snapshot: Snapshot = bincode::deserialize(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> ForecastResult<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            model_id = %snapshot.id(),
            customers = snapshot.codes.len(),
            "Loaded model snapshot"
        );
        Ok(snapshot)
    }

    /// Write to a sibling temp file then rename over `path`
    pub async fn persist(&self, path: &Path) -> ForecastResult<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Persisted model snapshot");
        Ok(())
    }
}
