use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::data::{Dataset, ForecastError, SalesSummary};
use crate::orchestrator::prediction::round_to;
use crate::orchestrator::PredictionResult;

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Sales Forecast API" }))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Value> {
    let products = state.source.list_products().await?;
    Ok(Json(json!(products)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<Value> {
    // a missing product is reported in the body, status stays 200
    match state.source.get_product(product_id).await? {
        Some(product) => Ok(Json(json!({ "product": product.product_name }))),
        None => Ok(Json(json!({ "message": "Product not found" }))),
    }
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<PredictionResult> {
    let Json(payload) =
        payload.map_err(|e| ForecastError::validation_error("body", e.body_text()))?;
    let result = state.predictions.predict(&payload).await?;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub message: String,
    pub rmse: f64,
    pub r2_score: f64,
}

pub async fn retrain(State(state): State<AppState>) -> ApiResult<RetrainResponse> {
    info!("Retrain requested over HTTP");
    let metrics = state.retrainer.retrain_from_source().await?;
    Ok(Json(RetrainResponse {
        message: "Model retrained successfully.".to_string(),
        rmse: round_to(metrics.rmse, 2),
        r2_score: round_to(metrics.r2_score, 4),
    }))
}

pub async fn sales_summary(State(state): State<AppState>) -> ApiResult<SalesSummary> {
    let rows = state.source.fetch_orders().await?;
    let dataset = Dataset::from_rows(rows)?;
    Ok(Json(SalesSummary::from_records(dataset.records())))
}
