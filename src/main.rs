//! FraudGuard - Main Entry Point
//!
//! Train a fraud classifier or serve it behind the prediction API.

use clap::Parser;
use fraudguard::cli::{cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraudguard=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            model_out,
            runs_dir,
        } => {
            cmd_train(data, model_out, runs_dir)?;
        }
        Commands::Serve { host, port, model } => {
            cmd_serve(host, port, model).await?;
        }
    }

    Ok(())
}
