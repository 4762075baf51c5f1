use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::data::ForecastError;

/// HTTP face of a `ForecastError`
#[derive(Debug)]
pub struct ApiError(pub ForecastError);

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ForecastError::Validation { .. } => StatusCode::BAD_REQUEST,
            ForecastError::NotFound { .. } => StatusCode::NOT_FOUND,
            ForecastError::TrainingTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ForecastError::TrainingCancelled => StatusCode::CONFLICT,
            ForecastError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            ForecastError::Validation { field, message } => json!({
                "detail": message,
                "field": field,
            }),
            err if err.is_reportable() => json!({ "detail": err.to_string() }),
            err => {
                // detail stays in the log
                error!(error = %err, "Request failed");
                json!({ "detail": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}
