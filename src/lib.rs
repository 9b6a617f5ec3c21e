//! FraudGuard - Credit-card fraud detection
//!
//! Two halves connected only through a serialized model bundle on disk:
//!
//! - [`pipeline`] - offline training: load/scale/split/resample the labeled
//!   CSV, fit the boosted classifier, evaluate, persist, and track the run
//! - [`server`] - the prediction API that loads the bundle once at startup
//!
//! # Modules
//!
//! - [`data`] - transaction schema, CSV loading, dataset acquisition
//! - [`preprocessing`] - standard scaling for the `Amount`/`Time` columns
//! - [`sampling`] - SMOTE rebalancing of the training partition
//! - [`model`] - gradient boosted trees and evaluation metrics
//! - [`artifact`] - the model bundle (classifier + scaler + schema)
//! - [`tracking`] - local experiment-tracking store
//! - [`cli`] - `train` / `serve` subcommands

pub mod error;

pub mod artifact;
pub mod data;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod sampling;
pub mod tracking;

pub mod cli;
pub mod server;

pub use error::{FraudGuardError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::artifact::{ModelBundle, ModelMetadata};
    pub use crate::data::TransactionRecord;
    pub use crate::error::{FraudGuardError, Result};
    pub use crate::model::{EvalMetrics, GradientBoostingClassifier, GradientBoostingConfig};
    pub use crate::pipeline::{run_training, TrainingOptions};
    pub use crate::preprocessing::StandardScaler;
    pub use crate::sampling::Smote;
    pub use crate::server::{create_router, AppState, ServerConfig};
    pub use crate::tracking::RunTracker;
}
