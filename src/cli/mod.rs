use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;

use salesforecast::Config;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "salesforecast",
    about = "Order quantity forecasting service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind, overrides SERVER_BIND_ADDR
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Retrain the model on the current order history and persist it
    Train,

    /// Print the sales summaries as JSON
    Summary,
}

/// Execute CLI command with database pool
pub async fn run(cli: Cli, config: Config, pool: PgPool) -> Result<()> {
    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind_addr.clone());
            info!(%bind, "Starting API server");
            commands::serve(pool, config, bind).await?;
        }
        Commands::Train => {
            info!("Retraining model");
            commands::train(pool, config).await?;
        }
        Commands::Summary => {
            info!("Computing sales summary");
            commands::summary(pool).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["salesforecast", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("0.0.0.0:9000")),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_train_verbose() {
        let cli = Cli::try_parse_from(["salesforecast", "-v", "train"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Train));
    }
}
