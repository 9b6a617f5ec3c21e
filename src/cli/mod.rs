//! Command-line interface
//!
//! Two subcommands mirroring the two halves of the system: `train` runs the
//! offline pipeline, `serve` hosts the prediction API.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::artifact::DEFAULT_MODEL_FILE;
use crate::pipeline::{run_training, TrainingOptions};
use crate::server::{run_server, ServerConfig};

fn step_ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

#[derive(Parser)]
#[command(name = "fraudguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Credit-card fraud detection: training pipeline and prediction API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the fraud classifier and persist the model bundle
    Train {
        /// Labeled transaction CSV (downloaded from Kaggle if absent)
        #[arg(long, default_value = "creditcard.csv")]
        data: PathBuf,

        /// Output path for the model bundle
        #[arg(long, default_value = DEFAULT_MODEL_FILE)]
        model_out: PathBuf,

        /// Experiment tracking directory
        #[arg(long, default_value = "runs")]
        runs_dir: PathBuf,
    },

    /// Serve the prediction API
    Serve {
        /// Bind host (default: API_HOST env var or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default: API_PORT env var or 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Model bundle path (default: MODEL_PATH env var or model.json)
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

/// Run the training pipeline and print a summary.
pub fn cmd_train(data: PathBuf, model_out: PathBuf, runs_dir: PathBuf) -> anyhow::Result<()> {
    let opts = TrainingOptions {
        data_path: data,
        model_out,
        runs_dir,
    };

    let outcome = run_training(&opts)?;

    step_ok(&format!(
        "trained on {} rows ({} synthetic), evaluated on {}",
        outcome.n_train, outcome.n_synthetic, outcome.n_test
    ));
    step_ok(&format!(
        "recall {:.4}, AUC {:.4}",
        outcome.metrics.recall, outcome.metrics.auc
    ));
    step_ok(&format!(
        "model saved to {} (run {})",
        outcome.model_path.display(),
        outcome.run_id
    ));

    Ok(())
}

/// Start the prediction server.
pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(model) = model {
        config.model_path = model;
    }

    run_server(config).await
}
