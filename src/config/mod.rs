use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::ml::{TrainingConfig, TreeParams};
use crate::orchestrator::RetrainSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
    pub test_ratio: f64,
    pub seed: u64,
    /// Unset grows the tree until leaves are pure
    pub max_depth: Option<u16>,
    pub retrain_timeout_seconds: u64,
    pub train_on_start: bool,
}

impl ModelConfig {
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            test_ratio: self.test_ratio,
            seed: self.seed,
            tree: TreeParams {
                max_depth: self.max_depth,
                seed: self.seed,
                ..TreeParams::default()
            },
        }
    }

    pub fn retrain_settings(&self) -> RetrainSettings {
        RetrainSettings {
            training: self.training_config(),
            timeout: (self.retrain_timeout_seconds > 0)
                .then(|| Duration::from_secs(self.retrain_timeout_seconds)),
            artifact_path: Some(self.artifact_path.clone()),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();

        // Database configuration - DATABASE_URL is required
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required but not set")?;

        let max_depth = match env::var("MODEL_MAX_DEPTH") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse()
                    .context("Invalid MODEL_MAX_DEPTH value")?,
            ),
            _ => None,
        };

        let config = Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS value")?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .context("Invalid DB_MIN_CONNECTIONS value")?,
            },
            server: ServerConfig {
                bind_addr: env::var("SERVER_BIND_ADDR")
                    .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            },
            model: ModelConfig {
                artifact_path: env::var("MODEL_ARTIFACT_PATH")
                    .unwrap_or_else(|_| "models/salesforecast.bin".to_string())
                    .into(),
                test_ratio: env::var("MODEL_TEST_RATIO")
                    .unwrap_or_else(|_| "0.2".to_string())
                    .parse()
                    .context("Invalid MODEL_TEST_RATIO value")?,
                seed: env::var("MODEL_SEED")
                    .unwrap_or_else(|_| "42".to_string())
                    .parse()
                    .context("Invalid MODEL_SEED value")?,
                max_depth,
                retrain_timeout_seconds: env::var("MODEL_RETRAIN_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("Invalid MODEL_RETRAIN_TIMEOUT_SECONDS value")?,
                train_on_start: env::var("MODEL_TRAIN_ON_START")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .context("Invalid MODEL_TRAIN_ON_START value (use true/false)")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio = self.model.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            bail!("MODEL_TEST_RATIO must be between 0 and 1, got {}", ratio);
        }
        if self.database.min_connections > self.database.max_connections {
            bail!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/northwind".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            server: ServerConfig {
                bind_addr: "127.0.0.1:8000".to_string(),
            },
            model: ModelConfig {
                artifact_path: PathBuf::from("models/salesforecast.bin"),
                test_ratio: 0.2,
                seed: 42,
                max_depth: None,
                retrain_timeout_seconds: 300,
                train_on_start: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_training_config_matches_pipeline_defaults() {
        let config = Config::default();
        assert_eq!(config.model.training_config(), TrainingConfig::default());
    }

    #[test]
    fn test_retrain_settings_from_model_config() {
        let mut model = Config::default().model;
        model.max_depth = Some(6);
        let settings = model.retrain_settings();
        assert_eq!(settings.timeout, Some(Duration::from_secs(300)));
        assert_eq!(settings.training.tree.max_depth, Some(6));
        assert_eq!(settings.artifact_path, Some(PathBuf::from("models/salesforecast.bin")));

        model.retrain_timeout_seconds = 0;
        assert_eq!(model.retrain_settings().timeout, None);
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.model.test_ratio = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pool_bounds() {
        let mut config = Config::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());
    }
}
