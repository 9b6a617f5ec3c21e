//! Regression tree for boosting residuals

use crate::error::{FraudGuardError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Variance-reducing regression tree.
///
/// Fit to log-loss residuals by the boosting loop; splits minimize weighted
/// child variance, found by a single sorted sweep per feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    max_depth: usize,
    min_samples_leaf: usize,
}

impl RegressionTree {
    pub fn new(max_depth: usize, min_samples_leaf: usize) -> Self {
        Self {
            root: None,
            max_depth,
            min_samples_leaf: min_samples_leaf.max(1),
        }
    }

    /// Fit the tree to `(x, y)`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(FraudGuardError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FraudGuardError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0));
        Ok(())
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FraudGuardError::ModelNotFitted)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| Self::predict_node(root, &row))
            .collect())
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: &ArrayView1<f64>) -> Result<f64> {
        let root = self.root.as_ref().ok_or(FraudGuardError::ModelNotFitted)?;
        Ok(Self::predict_node(root, row))
    }

    fn predict_node(node: &TreeNode, row: &ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_node(left, row)
                } else {
                    Self::predict_node(right, row)
                }
            }
        }
    }

    fn build_node(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

        let should_stop = n_samples < 2 * self.min_samples_leaf
            || depth >= self.max_depth
            || Self::variance(y, indices) < 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        match self.find_best_split(x, y, indices) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                if left_indices.len() < self.min_samples_leaf
                    || right_indices.len() < self.min_samples_leaf
                {
                    return TreeNode::Leaf {
                        value: mean,
                        n_samples,
                    };
                }

                let left = Box::new(self.build_node(x, y, &left_indices, depth + 1));
                let right = Box::new(self.build_node(x, y, &right_indices, depth + 1));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                }
            }
            None => TreeNode::Leaf {
                value: mean,
                n_samples,
            },
        }
    }

    /// Best (feature, threshold) by variance reduction.
    ///
    /// Each feature is scanned independently in parallel: sort the rows by
    /// feature value once, then sweep split positions with prefix sums.
    fn find_best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<(usize, f64)> {
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq_sum: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_impurity = total_sq_sum / n - (total_sum / n).powi(2);
        let min_leaf = self.min_samples_leaf;

        let per_feature: Vec<Option<(usize, f64, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], y[i]))
                    .collect();
                pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut best_gain = 0.0f64;
                let mut best_threshold = 0.0f64;

                let mut left_count = 0usize;
                let mut left_sum = 0.0f64;
                let mut left_sq_sum = 0.0f64;

                for w in 0..pairs.len() - 1 {
                    let (value, target) = pairs[w];
                    left_count += 1;
                    left_sum += target;
                    left_sq_sum += target * target;

                    let next_value = pairs[w + 1].0;
                    if next_value <= value {
                        continue; // No split point between equal values
                    }

                    let right_count = pairs.len() - left_count;
                    if left_count < min_leaf || right_count < min_leaf {
                        continue;
                    }

                    let lc = left_count as f64;
                    let rc = right_count as f64;
                    let right_sum = total_sum - left_sum;
                    let right_sq_sum = total_sq_sum - left_sq_sum;

                    let left_impurity = left_sq_sum / lc - (left_sum / lc).powi(2);
                    let right_impurity = right_sq_sum / rc - (right_sum / rc).powi(2);
                    let weighted = (lc * left_impurity + rc * right_impurity) / n;

                    let gain = parent_impurity - weighted;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = (value + next_value) / 2.0;
                    }
                }

                if best_gain > 1e-12 {
                    Some((feature_idx, best_threshold, best_gain))
                } else {
                    None
                }
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn variance(y: &Array1<f64>, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let sq_sum: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        (sq_sum / n - (sum / n).powi(2)).max(0.0)
    }
}
