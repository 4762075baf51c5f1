//! HTTP surface over the order source, prediction service and retrain
//! coordinator

pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::data::OrderSource;
use crate::orchestrator::{PredictionService, RetrainCoordinator};

/// Shared handler state; replaces any process-global model or dataset
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn OrderSource>,
    pub predictions: Arc<PredictionService>,
    pub retrainer: Arc<RetrainCoordinator>,
}

impl AppState {
    /// Wire a prediction service and a retrainer around one snapshot store
    pub fn new(source: Arc<dyn OrderSource>, retrainer: Arc<RetrainCoordinator>) -> Self {
        let predictions = Arc::new(PredictionService::new(retrainer.store().clone()));
        Self {
            source,
            predictions,
            retrainer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/products", get(handlers::list_products))
        .route("/products/:product_id", get(handlers::get_product))
        .route("/predict", post(handlers::predict))
        .route("/retrain", post(handlers::retrain))
        .route("/sales_summary", get(handlers::sales_summary))
        .with_state(state)
}
