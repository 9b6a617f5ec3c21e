//! SMOTE for binary class imbalance

use crate::error::{FraudGuardError, Result};
use crate::sampling::{class_counts, class_indices, ResampleResult};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered distance/index pair for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique), binary form.
///
/// Oversamples the minority class until it matches the majority count by
/// interpolating between each sampled minority row and one of its k nearest
/// minority neighbors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: Option<u64>,
}

impl Smote {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resample `(x, y)` so both classes have the majority count.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        if x.nrows() != y.len() {
            return Err(FraudGuardError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let counts = class_counts(y);
        if counts.len() != 2 {
            return Err(FraudGuardError::ValidationError(format!(
                "SMOTE requires exactly 2 classes, got {}",
                counts.len()
            )));
        }

        // Smaller count is the minority; on a tie there is nothing to do.
        let (&minority, &minority_count) = counts
            .iter()
            .min_by_key(|&(label, count)| (*count, *label))
            .unwrap();
        let majority_count = counts.values().max().copied().unwrap();
        let n_to_generate = majority_count - minority_count;

        if n_to_generate == 0 {
            return Ok(ResampleResult {
                x: x.clone(),
                y: y.clone(),
                n_synthetic: 0,
            });
        }

        if minority_count < 2 {
            return Err(FraudGuardError::ValidationError(format!(
                "SMOTE needs at least 2 minority samples, got {}",
                minority_count
            )));
        }

        let indices = class_indices(y);
        let minority_idx = indices.get(&minority).unwrap();
        let minority_rows: Vec<Vec<f64>> = minority_idx
            .iter()
            .map(|&i| x.row(i).iter().copied().collect())
            .collect();

        let k = self.k_neighbors.min(minority_rows.len() - 1).max(1);

        let mut rng = match self.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut synthetic: Vec<Vec<f64>> = Vec::with_capacity(n_to_generate);
        while synthetic.len() < n_to_generate {
            let idx = rng.gen_range(0..minority_rows.len());
            let sample = &minority_rows[idx];

            let neighbors = Self::find_neighbors(sample, &minority_rows, k);
            if neighbors.is_empty() {
                // All neighbors are duplicates of the sample; reuse it directly
                synthetic.push(sample.clone());
                continue;
            }

            let neighbor = &minority_rows[neighbors[rng.gen_range(0..neighbors.len())]];
            let gap: f64 = rng.gen();
            let row: Vec<f64> = sample
                .iter()
                .zip(neighbor.iter())
                .map(|(&p, &n)| p + gap * (n - p))
                .collect();
            synthetic.push(row);
        }

        // Original rows first, synthetic rows appended
        let n_original = x.nrows();
        let n_features = x.ncols();
        let n_total = n_original + synthetic.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = y.iter().copied().collect();
        all_y.extend(std::iter::repeat(minority).take(synthetic.len()));

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic: n_to_generate,
        })
    }

    fn distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// k nearest neighbors via BinaryHeap (O(n log k)); zero-distance rows
    /// (the sample itself and exact duplicates) are excluded.
    fn find_neighbors(point: &[f64], rows: &[Vec<f64>], k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

        for (i, row) in rows.iter().enumerate() {
            let dist = Self::distance(point, row);
            if dist <= 0.0 {
                continue;
            }
            if heap.len() < k {
                heap.push(Neighbor(dist, i));
            } else if let Some(&Neighbor(max_dist, _)) = heap.peek() {
                if dist < max_dist {
                    heap.pop();
                    heap.push(Neighbor(dist, i));
                }
            }
        }

        heap.into_iter().map(|Neighbor(_, i)| i).collect()
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced_data() -> (Array2<f64>, Array1<i64>) {
        // 20 legitimate rows near the origin, 5 fraud rows near (10, 10)
        let mut data = Vec::new();
        let mut labels = Vec::new();

        for i in 0..20 {
            data.push((i % 5) as f64);
            data.push((i / 5) as f64);
            labels.push(0i64);
        }
        for i in 0..5 {
            data.push(10.0 + (i % 3) as f64);
            data.push(10.0 + (i / 3) as f64);
            labels.push(1i64);
        }

        (
            Array2::from_shape_vec((25, 2), data).unwrap(),
            Array1::from_vec(labels),
        )
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = imbalanced_data();
        let smote = Smote::new().with_k_neighbors(3).with_seed(42);
        let result = smote.fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts.get(&0), counts.get(&1));
        assert_eq!(result.n_synthetic, 15);
        assert_eq!(result.x.nrows(), 40);
    }

    #[test]
    fn test_smote_preserves_original_rows() {
        let (x, y) = imbalanced_data();
        let smote = Smote::new().with_seed(42);
        let result = smote.fit_resample(&x, &y).unwrap();

        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                assert_eq!(result.x[[i, j]], x[[i, j]]);
            }
        }
    }

    #[test]
    fn test_smote_synthetics_interpolate_minority() {
        let (x, y) = imbalanced_data();
        let smote = Smote::new().with_k_neighbors(3).with_seed(7);
        let result = smote.fit_resample(&x, &y).unwrap();

        // Synthetic rows lie within the minority bounding box
        for i in x.nrows()..result.x.nrows() {
            for j in 0..2 {
                let v = result.x[[i, j]];
                assert!((10.0..=12.0).contains(&v), "synthetic value {} outside minority region", v);
            }
        }
    }

    #[test]
    fn test_smote_deterministic_with_seed() {
        let (x, y) = imbalanced_data();
        let a = Smote::new().with_seed(42).fit_resample(&x, &y).unwrap();
        let b = Smote::new().with_seed(42).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_smote_rejects_single_class() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = Array1::from_vec(vec![0i64, 0, 0, 0]);
        assert!(Smote::new().fit_resample(&x, &y).is_err());
    }
}
