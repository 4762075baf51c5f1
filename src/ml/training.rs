//! Training pipeline: code table, encoding, split, fit and held-out scoring

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{Dataset, ForecastError, ForecastResult};

use super::codes::CategoryCodeTable;
use super::features::{FeatureEncoder, FEATURE_COUNT};
use super::model::{fit_tree, Metrics, ModelArtifact, Snapshot, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of rows held out for scoring
    pub test_ratio: f64,
    /// Seed of the train/test shuffle
    pub seed: u64,
    pub tree: TreeParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            tree: TreeParams::default(),
        }
    }
}

/// Shuffled train/test row indices. The test partition takes
/// `ceil(len * test_ratio)` rows; both partitions must be non-empty.
pub fn train_test_split(len: usize, test_ratio: f64, seed: u64) -> ForecastResult<(Vec<usize>, Vec<usize>)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ForecastError::training_error(format!(
            "test ratio must be between 0 and 1, got {}",
            test_ratio
        )));
    }

    let test_len = (len as f64 * test_ratio).ceil() as usize;
    if test_len == 0 || test_len >= len {
        return Err(ForecastError::training_error(format!(
            "dataset of {} rows is too small to split with test ratio {}",
            len, test_ratio
        )));
    }

    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(test_len);
    Ok((train, indices))
}

/// Root-mean-squared error and coefficient of determination
pub fn score(y_true: &[f64], y_pred: &[f64]) -> (f64, f64) {
    let y_true = y_true.to_vec();
    let y_pred = y_pred.to_vec();
    let mse: f64 = smartcore::metrics::mean_squared_error(&y_true, &y_pred);
    let r2: f64 = smartcore::metrics::r2(&y_true, &y_pred);
    (mse.sqrt(), r2)
}

/// Build a fresh snapshot from a dataset. Deterministic for a fixed dataset
/// and config, apart from the artifact id and timestamp.
pub fn train_snapshot(dataset: &Dataset, config: &TrainingConfig) -> ForecastResult<(Snapshot, Metrics)> {
    if dataset.is_empty() {
        return Err(ForecastError::training_error("dataset is empty"));
    }

    let codes = CategoryCodeTable::build(dataset.records().iter().map(|r| r.customer_id.as_str()));
    let encoder = FeatureEncoder::new(&codes);

    let mut features: Vec<[f64; FEATURE_COUNT]> = Vec::with_capacity(dataset.len());
    let mut targets: Vec<f64> = Vec::with_capacity(dataset.len());
    for record in dataset.records() {
        features.push(encoder.encode_record(record)?.values);
        targets.push(f64::from(record.quantity));
    }

    let (train_idx, test_idx) = train_test_split(dataset.len(), config.test_ratio, config.seed)?;
    let pick = |idx: &[usize]| -> (Vec<[f64; FEATURE_COUNT]>, Vec<f64>) {
        idx.iter().map(|&i| (features[i], targets[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    let tree = fit_tree(&x_train, &y_train, config.tree)?;
    let provisional = ModelArtifact::new(tree, config.tree, placeholder_metrics(), &codes);
    let y_pred = provisional.predict_rows(&x_test)?;
    let (rmse, r2_score) = score(&y_test, &y_pred);

    let metrics = Metrics {
        rmse,
        r2_score,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    };
    let artifact = provisional.with_metrics(metrics);

    info!(
        model_id = %artifact.id,
        rmse,
        r2_score,
        train_rows = metrics.train_rows,
        test_rows = metrics.test_rows,
        customers = codes.len(),
        "Trained decision tree"
    );

    Ok((Snapshot::new(artifact, codes)?, metrics))
}

fn placeholder_metrics() -> Metrics {
    Metrics {
        rmse: f64::NAN,
        r2_score: f64::NAN,
        train_rows: 0,
        test_rows: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OrderRecord;
    use chrono::NaiveDate;

    fn dataset(rows: usize) -> Dataset {
        let customers = ["ALFKI", "ANATR", "ANTON", "AROUT"];
        let records = (0..rows)
            .map(|i| OrderRecord {
                customer_id: customers[i % customers.len()].to_string(),
                order_date: NaiveDate::from_ymd_opt(1997, (i % 12) as u32 + 1, (i % 28) as u32 + 1).unwrap(),
                category_id: (i % 3) as i32 + 1,
                product_id: (i % 7) as i32 + 1,
                unit_price: 10.0 + (i % 5) as f64,
                quantity: ((i * 7) % 40) as u32 + 1,
                discount: if i % 4 == 0 { 0.1 } else { 0.0 },
            })
            .collect();
        Dataset::new(records)
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 42).unwrap(), train_test_split(50, 0.2, 42).unwrap());
        assert_ne!(train_test_split(50, 0.2, 42).unwrap(), train_test_split(50, 0.2, 7).unwrap());
    }

    #[test]
    fn test_split_rejects_tiny_datasets_and_bad_ratios() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(10, 0.0, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
        assert!(train_test_split(2, 0.2, 42).is_ok());
    }

    #[test]
    fn test_score_perfect_fit() {
        let (rmse, r2) = score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(rmse, 0.0);
        assert!((r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_known_values() {
        let (rmse, r2) = score(&[1.0, 2.0, 3.0, 4.0], &[2.0, 2.0, 3.0, 3.0]);
        assert!((rmse - (0.5f64).sqrt()).abs() < 1e-12);
        // ss_res = 2, ss_tot = 5
        assert!((r2 - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_dataset_is_training_error() {
        let err = train_snapshot(&Dataset::default(), &TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::Training(_)));
    }

    #[test]
    fn test_training_is_deterministic() {
        let data = dataset(80);
        let config = TrainingConfig::default();
        let (first, m1) = train_snapshot(&data, &config).unwrap();
        let (second, m2) = train_snapshot(&data, &config).unwrap();

        assert_eq!(m1.rmse.to_bits(), m2.rmse.to_bits());
        assert_eq!(m1.r2_score.to_bits(), m2.r2_score.to_bits());
        assert_eq!(first.codes(), second.codes());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_snapshot_pairs_codes_with_artifact() {
        let (snapshot, metrics) = train_snapshot(&dataset(40), &TrainingConfig::default()).unwrap();
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.codes().lookup("ALFKI"), 0);
        assert_eq!(snapshot.codes().len(), 4);
        assert_eq!(metrics.train_rows + metrics.test_rows, 40);
        assert_eq!(snapshot.artifact().metrics, metrics);
    }
}
