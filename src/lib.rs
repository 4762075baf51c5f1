// SalesForecast - order quantity forecasting service
// Trains a decision tree on historical order lines and serves predictions over HTTP,
// retraining in place without interrupting requests.

#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod api;
pub mod config;
pub mod data;
pub mod db;
pub mod ml;
pub mod orchestrator;

// Re-export commonly used items
pub use config::Config;
pub use data::{ForecastError, ForecastResult, OrderRecord, OrderRow, Product};
pub use ml::{CategoryCodeTable, FeatureEncoder, Metrics, Snapshot};
pub use orchestrator::{PredictionService, RetrainCoordinator, SnapshotStore};
