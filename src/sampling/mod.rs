//! Minority-class resampling
//!
//! SMOTE rebalances the training partition by interpolating synthetic fraud
//! rows between minority-class nearest neighbors. Applied to the training
//! split only; the held-out test split is never resampled.

mod smote;

pub use smote::Smote;

use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Result of resampling: original rows first, synthetic rows appended.
#[derive(Debug, Clone)]
pub struct ResampleResult {
    pub x: Array2<f64>,
    pub y: Array1<i64>,
    /// Number of synthetic rows appended.
    pub n_synthetic: usize,
}

/// Count rows per class label.
pub fn class_counts(y: &Array1<i64>) -> HashMap<i64, usize> {
    let mut counts = HashMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Row indices per class label.
pub fn class_indices(y: &Array1<i64>) -> HashMap<i64, Vec<usize>> {
    let mut indices = HashMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}
