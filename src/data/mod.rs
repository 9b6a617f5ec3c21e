//! Dataset schema, loading, and acquisition
//!
//! The transaction schema is the train/serve contract: the 30 feature columns
//! in [`FEATURE_COLUMNS`] order, plus the [`LABEL_COLUMN`] in training data.

use crate::error::{FraudGuardError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Feature columns in canonical order: time offset, 28 anonymized principal
/// components, and the transaction amount.
pub const FEATURE_COLUMNS: [&str; 30] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Binary class label column (0 = legitimate, 1 = fraud), training data only.
pub const LABEL_COLUMN: &str = "Class";

/// Columns standardized during training; the fitted scaler travels with the
/// model so serving applies the same transform.
pub const SCALED_COLUMNS: [&str; 2] = ["Amount", "Time"];

/// Kaggle dataset slug for the public credit-card fraud data.
pub const KAGGLE_DATASET: &str = "mlg-ulb/creditcardfraud";

/// A single transaction as posted to the prediction endpoint.
///
/// Field names on the wire match the CSV header exactly. Unknown fields are
/// rejected so a malformed payload fails loudly instead of predicting on
/// garbage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRecord {
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "V1")]
    pub v1: f64,
    #[serde(rename = "V2")]
    pub v2: f64,
    #[serde(rename = "V3")]
    pub v3: f64,
    #[serde(rename = "V4")]
    pub v4: f64,
    #[serde(rename = "V5")]
    pub v5: f64,
    #[serde(rename = "V6")]
    pub v6: f64,
    #[serde(rename = "V7")]
    pub v7: f64,
    #[serde(rename = "V8")]
    pub v8: f64,
    #[serde(rename = "V9")]
    pub v9: f64,
    #[serde(rename = "V10")]
    pub v10: f64,
    #[serde(rename = "V11")]
    pub v11: f64,
    #[serde(rename = "V12")]
    pub v12: f64,
    #[serde(rename = "V13")]
    pub v13: f64,
    #[serde(rename = "V14")]
    pub v14: f64,
    #[serde(rename = "V15")]
    pub v15: f64,
    #[serde(rename = "V16")]
    pub v16: f64,
    #[serde(rename = "V17")]
    pub v17: f64,
    #[serde(rename = "V18")]
    pub v18: f64,
    #[serde(rename = "V19")]
    pub v19: f64,
    #[serde(rename = "V20")]
    pub v20: f64,
    #[serde(rename = "V21")]
    pub v21: f64,
    #[serde(rename = "V22")]
    pub v22: f64,
    #[serde(rename = "V23")]
    pub v23: f64,
    #[serde(rename = "V24")]
    pub v24: f64,
    #[serde(rename = "V25")]
    pub v25: f64,
    #[serde(rename = "V26")]
    pub v26: f64,
    #[serde(rename = "V27")]
    pub v27: f64,
    #[serde(rename = "V28")]
    pub v28: f64,
    #[serde(rename = "Amount")]
    pub amount: f64,
}

impl TransactionRecord {
    /// Look up a feature value by its canonical column name.
    pub fn feature(&self, column: &str) -> Option<f64> {
        let value = match column {
            "Time" => self.time,
            "V1" => self.v1,
            "V2" => self.v2,
            "V3" => self.v3,
            "V4" => self.v4,
            "V5" => self.v5,
            "V6" => self.v6,
            "V7" => self.v7,
            "V8" => self.v8,
            "V9" => self.v9,
            "V10" => self.v10,
            "V11" => self.v11,
            "V12" => self.v12,
            "V13" => self.v13,
            "V14" => self.v14,
            "V15" => self.v15,
            "V16" => self.v16,
            "V17" => self.v17,
            "V18" => self.v18,
            "V19" => self.v19,
            "V20" => self.v20,
            "V21" => self.v21,
            "V22" => self.v22,
            "V23" => self.v23,
            "V24" => self.v24,
            "V25" => self.v25,
            "V26" => self.v26,
            "V27" => self.v27,
            "V28" => self.v28,
            "Amount" => self.amount,
            _ => return None,
        };
        Some(value)
    }
}

/// Ensure the dataset CSV exists, invoking the Kaggle CLI to fetch it if not.
///
/// Download failure is fatal for the training run: the error propagates out
/// and the process exits nonzero. Credentials are the Kaggle CLI's own
/// configuration.
pub fn ensure_dataset(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    info!(path = %path.display(), dataset = KAGGLE_DATASET, "Dataset not found, downloading from Kaggle");

    let status = Command::new("kaggle")
        .args(["datasets", "download", "-d", KAGGLE_DATASET, "--unzip"])
        .status()
        .map_err(|e| {
            FraudGuardError::DownloadError(format!(
                "could not invoke the kaggle CLI (is it installed and configured?): {}",
                e
            ))
        })?;

    if !status.success() {
        return Err(FraudGuardError::DownloadError(format!(
            "kaggle CLI exited with {}",
            status
        )));
    }

    if !path.exists() {
        return Err(FraudGuardError::DownloadError(format!(
            "download completed but {} is still missing",
            path.display()
        )));
    }

    info!(path = %path.display(), "Download complete");
    Ok(())
}

/// Load the labeled transaction CSV and validate its schema.
pub fn load_transactions(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| FraudGuardError::DataError(e.to_string()))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| FraudGuardError::DataError(e.to_string()))?;

    for col in FEATURE_COLUMNS.iter().chain([LABEL_COLUMN].iter()) {
        if df.column(col).is_err() {
            return Err(FraudGuardError::ColumnNotFound(col.to_string()));
        }
    }

    Ok(df)
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| FraudGuardError::ColumnNotFound(col_name.clone()))?;
            let series_f64 = series
                .cast(&DataType::Float64)
                .map_err(|e| FraudGuardError::DataError(e.to_string()))?;
            let values: Vec<f64> = series_f64
                .f64()
                .map_err(|e| FraudGuardError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract the label column as integer class labels.
pub fn label_array(df: &DataFrame) -> Result<Array1<i64>> {
    let series = df
        .column(LABEL_COLUMN)
        .map_err(|_| FraudGuardError::ColumnNotFound(LABEL_COLUMN.to_string()))?;
    let series_i64 = series
        .cast(&DataType::Int64)
        .map_err(|e| FraudGuardError::DataError(e.to_string()))?;
    let labels: Vec<i64> = series_i64
        .i64()
        .map_err(|e| FraudGuardError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0))
        .collect();
    Ok(Array1::from_vec(labels))
}
