use anyhow::Result;
use salesforecast::config::Config;
use salesforecast::data::{Dataset, OrderSource, PgOrderSource};

#[test]
fn test_config_missing_database_url() {
    if std::env::var("DATABASE_URL").is_ok() || std::path::Path::new(".env").exists() {
        // Skip when a database is configured
        return;
    }
    let result = Config::load();
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("database_url"));
}

#[tokio::test]
async fn test_database_health_check() -> Result<()> {
    if std::env::var("DATABASE_URL").is_err() {
        // Skip test if no database configured
        return Ok(());
    }

    let config = Config::load()?;
    let db = salesforecast::db::Database::new(&config.database).await?;
    db.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn test_order_rows_from_database() -> Result<()> {
    if std::env::var("DATABASE_URL").is_err() {
        return Ok(());
    }

    let config = Config::load()?;
    let db = salesforecast::db::Database::new(&config.database).await?;
    let source = PgOrderSource::new(db.pool.clone());

    let dataset = Dataset::from_rows(source.fetch_orders().await?)?;
    assert!(!dataset.is_empty());
    assert!(!source.list_products().await?.is_empty());
    assert!(source.get_product(-1).await?.is_none());
    Ok(())
}
