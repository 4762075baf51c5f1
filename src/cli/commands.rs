use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};

use salesforecast::api::{self, AppState};
use salesforecast::data::{Dataset, ForecastError, OrderSource, PgOrderSource, SalesSummary};
use salesforecast::orchestrator::{RetrainCoordinator, SnapshotStore};
use salesforecast::Config;

fn coordinator(source: Arc<dyn OrderSource>, config: &Config) -> Arc<RetrainCoordinator> {
    Arc::new(RetrainCoordinator::new(
        source,
        Arc::new(SnapshotStore::new()),
        config.model.retrain_settings(),
    ))
}

/// Load the persisted snapshot, falling back to a fresh retrain when allowed
async fn warm_up(retrainer: &RetrainCoordinator, config: &Config) -> Result<()> {
    match retrainer.load_persisted().await {
        Ok(true) => return Ok(()),
        Ok(false) => info!(path = %config.model.artifact_path.display(), "No persisted model snapshot"),
        Err(ForecastError::SchemaMismatch { expected, found }) => {
            warn!(%expected, %found, "Persisted model snapshot is stale, ignoring it");
        }
        Err(e) => {
            warn!(error = %e, "Failed to load persisted model snapshot");
        }
    }

    if config.model.train_on_start {
        let metrics = retrainer
            .retrain_from_source()
            .await
            .context("Initial training failed")?;
        info!(rmse = metrics.rmse, r2_score = metrics.r2_score, "Initial model trained");
    } else {
        warn!("No model loaded; /predict answers 503 until POST /retrain succeeds");
    }
    Ok(())
}

pub async fn serve(pool: PgPool, config: Config, bind: String) -> Result<()> {
    let source: Arc<dyn OrderSource> = Arc::new(PgOrderSource::new(pool));
    let retrainer = coordinator(source.clone(), &config);
    warm_up(&retrainer, &config).await?;

    let app = api::router(AppState::new(source, retrainer.clone()));
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(addr = %bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            retrainer.cancel();
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

pub async fn train(pool: PgPool, config: Config) -> Result<()> {
    let source: Arc<dyn OrderSource> = Arc::new(PgOrderSource::new(pool));
    let retrainer = coordinator(source, &config);
    let metrics = retrainer.retrain_from_source().await.context("Training failed")?;

    println!("Model retrained successfully.");
    println!("RMSE: {:.2}", metrics.rmse);
    println!("R2 score: {:.4}", metrics.r2_score);
    println!("Rows: {} train / {} test", metrics.train_rows, metrics.test_rows);
    println!("Saved to {}", config.model.artifact_path.display());
    Ok(())
}

pub async fn summary(pool: PgPool) -> Result<()> {
    let source = PgOrderSource::new(pool);
    let rows = source.fetch_orders().await.context("Failed to fetch orders")?;
    let dataset = Dataset::from_rows(rows)?;
    let summary = SalesSummary::from_records(dataset.records());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
