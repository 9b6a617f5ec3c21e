//! Classification evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics reported for a trained classifier on the held-out test split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Fraction of actual fraud rows flagged at the 0.5 threshold
    pub recall: f64,
    /// Area under the ROC curve over predicted probabilities
    pub auc: f64,
    /// Test rows scored
    pub n_test: usize,
}

impl EvalMetrics {
    /// Compute recall (threshold 0.5) and AUC from probabilities.
    pub fn compute(y_true: &Array1<i64>, probs: &Array1<f64>) -> Self {
        Self {
            recall: recall_score(y_true, probs, 0.5),
            auc: roc_auc_score(y_true, probs),
            n_test: y_true.len(),
        }
    }
}

/// Recall of the positive class with predictions thresholded at
/// `probability > threshold`. Zero when there are no positive rows.
pub fn recall_score(y_true: &Array1<i64>, probs: &Array1<f64>, threshold: f64) -> f64 {
    let mut tp = 0usize;
    let mut fn_ = 0usize;

    for (t, p) in y_true.iter().zip(probs.iter()) {
        if *t == 1 {
            if *p > threshold {
                tp += 1;
            } else {
                fn_ += 1;
            }
        }
    }

    if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}

/// ROC AUC via the rank statistic: the probability a random positive is
/// ranked above a random negative, with tied scores sharing average ranks.
/// Returns 0.5 when either class is absent (the curve is undefined).
pub fn roc_auc_score(y_true: &Array1<i64>, probs: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = n - n_pos;

    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        probs[a]
            .partial_cmp(&probs[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks over ties, accumulate rank sum of positives
    let mut rank_sum_pos = 0.0f64;
    let mut i = 0usize;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block [i, j] shares the average rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos as f64 * n_neg as f64)
}
