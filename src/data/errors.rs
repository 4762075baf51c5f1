use thiserror::Error;

/// Error taxonomy shared by the data, model and serving layers
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Training timed out after {seconds}s")]
    TrainingTimeout { seconds: u64 },

    #[error("Training was cancelled")]
    TrainingCancelled,

    #[error("No trained model is loaded")]
    ModelUnavailable,

    #[error("Feature schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for forecasting operations
pub type ForecastResult<T> = Result<T, ForecastError>;

impl ForecastError {
    /// Create a validation error with field context
    pub fn validation_error<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        ForecastError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training_error<S: Into<String>>(message: S) -> Self {
        ForecastError::Training(message.into())
    }

    pub fn not_found<E: Into<String>, I: ToString>(entity: E, id: I) -> Self {
        ForecastError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Errors caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::Validation { .. } | ForecastError::NotFound { .. }
        )
    }

    /// Errors whose message is safe to echo back to an HTTP caller
    pub fn is_reportable(&self) -> bool {
        match self {
            ForecastError::Validation { .. }
            | ForecastError::NotFound { .. }
            | ForecastError::Training(_)
            | ForecastError::TrainingTimeout { .. }
            | ForecastError::TrainingCancelled
            | ForecastError::ModelUnavailable => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_names_field() {
        let err = ForecastError::validation_error("unit_price", "expected a number");
        assert_eq!(
            err.to_string(),
            "Validation error: unit_price - expected a number"
        );
        assert!(err.is_client_error());
        assert!(err.is_reportable());
    }

    #[test]
    fn test_not_found_message() {
        let err = ForecastError::not_found("Product", 999);
        assert_eq!(err.to_string(), "Product 999 not found");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_errors_are_not_reportable() {
        let io = ForecastError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_reportable());
        assert!(!io.is_client_error());
        assert!(!ForecastError::Internal("boom".into()).is_reportable());
        assert!(ForecastError::training_error("empty dataset").is_reportable());
    }
}
