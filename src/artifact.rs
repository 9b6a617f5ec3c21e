//! Model bundle persistence
//!
//! The bundle is the train/serve contract in one file: fitted classifier,
//! fitted scaler, the feature-column order, and run metadata. Written once by
//! training, loaded once by serving at startup, immutable thereafter.

use crate::data::TransactionRecord;
use crate::error::{FraudGuardError, Result};
use crate::model::{EvalMetrics, GradientBoostingClassifier, GradientBoostingConfig};
use crate::preprocessing::StandardScaler;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default artifact filename, matching what `serve` looks for.
pub const DEFAULT_MODEL_FILE: &str = "model.json";

/// Metadata recorded alongside the fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub run_id: String,
    pub trained_at: String,
    pub params: GradientBoostingConfig,
    pub metrics: EvalMetrics,
}

/// Serialized model artifact: classifier + scaler + schema + metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub classifier: GradientBoostingClassifier,
    pub scaler: StandardScaler,
    pub feature_columns: Vec<String>,
    pub metadata: ModelMetadata,
}

impl ModelBundle {
    /// Write the bundle as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a bundle back from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&json)?;
        Ok(bundle)
    }

    /// Score one raw transaction: apply the bundled scaler, assemble the
    /// single-row feature matrix in the recorded column order, and return the
    /// fraud probability.
    pub fn fraud_probability(&self, record: &TransactionRecord) -> Result<f64> {
        let features: Vec<f64> = self
            .feature_columns
            .iter()
            .map(|col| {
                record
                    .feature(col)
                    .map(|v| self.scaler.scale_value(col, v))
                    .ok_or_else(|| FraudGuardError::ColumnNotFound(col.clone()))
            })
            .collect::<Result<Vec<f64>>>()?;

        let x = Array2::from_shape_vec((1, features.len()), features)
            .map_err(|e| FraudGuardError::DataError(e.to_string()))?;

        let probs = self.classifier.predict_proba(&x)?;
        Ok(probs[0])
    }
}
