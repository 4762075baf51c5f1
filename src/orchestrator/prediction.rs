//! Prediction service: validate, encode against the active snapshot, predict

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::data::{ForecastError, ForecastResult};
use crate::ml::{FeatureEncoder, FeatureInput, Predictor};

use super::snapshot_store::SnapshotStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionDetails {
    pub product_id: i64,
    /// Echoed exactly as the caller sent it
    pub customer_id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_quantity: f64,
    pub details: PredictionDetails,
    pub warnings: Vec<String>,
    pub model_id: Uuid,
}

pub struct PredictionService {
    store: Arc<SnapshotStore>,
}

impl PredictionService {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Predict the order quantity for a raw request body
    pub async fn predict(&self, payload: &Value) -> ForecastResult<PredictionResult> {
        let input = FeatureInput::from_payload(payload)?;
        let customer_id = payload.get("customer_id").cloned().unwrap_or(Value::Null);
        self.predict_input(&input, customer_id).await
    }

    pub async fn predict_input(&self, input: &FeatureInput, customer_id: Value) -> ForecastResult<PredictionResult> {
        // One snapshot for the whole call: a concurrent retrain cannot
        // swap the code table out from under the model mid-request.
        let snapshot = self.store.current().await.ok_or(ForecastError::ModelUnavailable)?;

        let encoded = FeatureEncoder::new(snapshot.codes()).encode(input)?;
        let mut warnings = Vec::new();
        if encoded.unknown_customer {
            warn!(
                customer_id = %input.customer_key,
                model_id = %snapshot.id(),
                "Unknown customer, falling back to default category code"
            );
            warnings.push(format!(
                "unknown customer '{}': default code {} used, prediction may be less accurate",
                input.customer_key, encoded.customer_code
            ));
        }

        let raw = snapshot.artifact().predict(&encoded)?;
        let predicted_quantity = round_to(raw.max(0.0), 2);

        debug!(
            model_id = %snapshot.id(),
            product_id = input.product_id,
            predicted_quantity,
            "Prediction served"
        );

        Ok(PredictionResult {
            predicted_quantity,
            details: PredictionDetails {
                product_id: input.product_id,
                customer_id,
            },
            warnings,
            model_id: snapshot.id(),
        })
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(0.123_45, 4), 0.1235);
        assert_eq!(round_to(3.0, 2), 3.0);
    }

    #[tokio::test]
    async fn test_predict_without_model_is_unavailable() {
        let service = PredictionService::new(Arc::new(SnapshotStore::new()));
        let body = serde_json::json!({
            "product_id": 11, "customer_id": 7, "category_id": 2, "unit_price": 14.0,
            "discount": 0.1, "order_month": 7, "order_day": 15, "total_spent": 126.0
        });
        let err = service.predict(&body).await.unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable));
    }

    #[tokio::test]
    async fn test_validation_runs_before_model_lookup() {
        let service = PredictionService::new(Arc::new(SnapshotStore::new()));
        let err = service.predict(&serde_json::json!({"product_id": 11})).await.unwrap_err();
        assert!(matches!(err, ForecastError::Validation { .. }));
    }
}
