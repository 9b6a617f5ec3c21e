//! Feature scaling
//!
//! Training standardizes the `Amount` and `Time` columns; the fitted scaler is
//! persisted inside the model bundle so serving applies the identical
//! transform to raw transactions.

use crate::error::{FraudGuardError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-column standardization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnStats {
    mean: f64,
    std: f64,
}

/// Z-score standardizer: `(x - mean) / std`, fit per column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ColumnStats>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit mean/std for each named column.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| FraudGuardError::ColumnNotFound(col_name.to_string()))?;
            // Integer-typed columns (CSV inference) are standardized as floats
            let series = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|e| FraudGuardError::DataError(e.to_string()))?;
            let ca = series
                .f64()
                .map_err(|e| FraudGuardError::DataError(e.to_string()))?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(1.0);
            self.params.insert(
                col_name.to_string(),
                ColumnStats {
                    mean,
                    std: if std == 0.0 { 1.0 } else { std },
                },
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the fitted columns, leaving all others untouched.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudGuardError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .filter_map(|(col_name, stats)| {
                df.column(col_name).ok().map(|column| {
                    let series = column.as_materialized_series();
                    self.scale_series(series, stats)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result = result
                .with_column(scaled)
                .map_err(|e| FraudGuardError::DataError(e.to_string()))?
                .clone();
        }

        Ok(result)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Scale a single value. Columns the scaler was not fit on pass through
    /// unchanged, so callers can feed every feature through this uniformly.
    pub fn scale_value(&self, column: &str, value: f64) -> f64 {
        match self.params.get(column) {
            Some(stats) => (value - stats.mean) / stats.std,
            None => value,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn scale_series(&self, series: &Series, stats: &ColumnStats) -> Result<Series> {
        let as_f64 = series
            .cast(&DataType::Float64)
            .map_err(|e| FraudGuardError::DataError(e.to_string()))?;
        let ca = as_f64
            .f64()
            .map_err(|e| FraudGuardError::DataError(e.to_string()))?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - stats.mean) / stats.std))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts_df() -> DataFrame {
        DataFrame::new(vec![
            Series::new("Amount".into(), &[10.0, 20.0, 30.0, 40.0, 50.0]).into(),
            Series::new("V1".into(), &[1.0, 1.0, 1.0, 1.0, 1.0]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_scaled_column_has_zero_mean_unit_variance() {
        let df = amounts_df();
        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&df, &["Amount"]).unwrap();

        let col = result.column("Amount").unwrap().f64().unwrap();
        assert!(col.mean().unwrap().abs() < 1e-10);
        assert!((col.std(1).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_unfitted_columns_untouched() {
        let df = amounts_df();
        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&df, &["Amount"]).unwrap();

        let v1 = result.column("V1").unwrap().f64().unwrap();
        for v in v1.into_iter() {
            assert_eq!(v.unwrap(), 1.0);
        }
    }

    #[test]
    fn test_scale_value_matches_column_transform() {
        let df = amounts_df();
        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&df, &["Amount"]).unwrap();

        let col = result.column("Amount").unwrap().f64().unwrap();
        let first = col.into_iter().next().unwrap().unwrap();
        assert!((scaler.scale_value("Amount", 10.0) - first).abs() < 1e-12);
        // Pass-through for columns the scaler never saw
        assert_eq!(scaler.scale_value("V1", 7.5), 7.5);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let df = amounts_df();
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&df),
            Err(FraudGuardError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_constant_column_does_not_divide_by_zero() {
        let df = DataFrame::new(vec![
            Series::new("Time".into(), &[5.0, 5.0, 5.0]).into(),
        ])
        .unwrap();
        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&df, &["Time"]).unwrap();
        let col = result.column("Time").unwrap().f64().unwrap();
        for v in col.into_iter() {
            assert!(v.unwrap().is_finite());
        }
    }
}
