//! Gradient boosted trees for binary classification
//!
//! Boosts regression trees against log-loss residuals, in the manner of
//! XGBoost/LightGBM but specialized to a single binary objective.

use crate::error::{FraudGuardError, Result};
use crate::model::tree::RegressionTree;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio per tree
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

/// Binary gradient boosting classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<RegressionTree>,
    initial_log_odds: f64,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit to binary labels (0.0 / 1.0).
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples == 0 {
            return Err(FraudGuardError::TrainingError(
                "cannot fit on an empty training set".to_string(),
            ));
        }
        if n_samples != y.len() {
            return Err(FraudGuardError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }

        self.n_features = x.ncols();
        self.trees = Vec::with_capacity(self.config.n_estimators);

        // Initial prediction: log odds of the positive rate
        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        for _ in 0..self.config.n_estimators {
            // Gradient of log loss: y - sigmoid(log_odds)
            let residuals: Array1<f64> = if n_samples > 10_000 {
                let lo = &log_odds;
                let res: Vec<f64> = (0..n_samples)
                    .into_par_iter()
                    .map(|i| y[i] - sigmoid(lo[i]))
                    .collect();
                Array1::from_vec(res)
            } else {
                y.iter()
                    .zip(log_odds.iter())
                    .map(|(yi, lo)| yi - sigmoid(*lo))
                    .collect()
            };

            let mut tree = RegressionTree::new(self.config.max_depth, self.config.min_samples_leaf);

            if self.config.subsample < 1.0 {
                let sample_indices = self.subsample_indices(n_samples, &mut rng);
                let x_sub = x.select(ndarray::Axis(0), &sample_indices);
                let y_sub: Array1<f64> =
                    Array1::from_iter(sample_indices.iter().map(|&i| residuals[i]));
                tree.fit(&x_sub, &y_sub)?;
            } else {
                tree.fit(x, &residuals)?;
            }

            // Update every row with the shrunken tree prediction
            let tree_pred = tree.predict(x)?;
            for i in 0..n_samples {
                log_odds[i] += self.config.learning_rate * tree_pred[i];
            }

            self.trees.push(tree);
        }

        Ok(())
    }

    /// Predicted probability of the positive (fraud) class per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FraudGuardError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(FraudGuardError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n = x.nrows();
        let mut log_odds = Array1::from_elem(n, self.initial_log_odds);

        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            for i in 0..n {
                log_odds[i] += self.config.learning_rate * tree_pred[i];
            }
        }

        Ok(log_odds.iter().map(|&lo| sigmoid(lo)).collect())
    }

    /// Predicted class labels at the 0.5 threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs
            .iter()
            .map(|&p| if p > 0.5 { 1.0 } else { 0.0 })
            .collect())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = ((n as f64) * self.config.subsample).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(1));
        indices.sort();
        indices
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 10.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            learning_rate: 0.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_classifier_learns_separable_data() {
        let (x, y) = separable_data();
        let mut model = GradientBoostingClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = y
            .iter()
            .zip(predictions.iter())
            .filter(|(yi, pi)| (*yi - *pi).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.9, "accuracy {} too low", accuracy);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = separable_data();
        let mut model = GradientBoostingClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let probs = model.predict_proba(&x).unwrap();
        for p in probs.iter() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn test_flag_iff_probability_above_half() {
        let (x, y) = separable_data();
        let mut model = GradientBoostingClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let probs = model.predict_proba(&x).unwrap();
        let flags = model.predict(&x).unwrap();
        for (p, f) in probs.iter().zip(flags.iter()) {
            assert_eq!(*f == 1.0, *p > 0.5);
        }
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let (x, y) = separable_data();

        let mut a = GradientBoostingClassifier::new(small_config());
        a.fit(&x, &y).unwrap();
        let mut b = GradientBoostingClassifier::new(small_config());
        b.fit(&x, &y).unwrap();

        let pa = a.predict_proba(&x).unwrap();
        let pb = b.predict_proba(&x).unwrap();
        for (u, v) in pa.iter().zip(pb.iter()) {
            assert_eq!(u, v);
        }
    }

    #[test]
    fn test_predict_unfitted_errors() {
        let model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        let x = Array2::zeros((1, 2));
        assert!(matches!(
            model.predict_proba(&x),
            Err(FraudGuardError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_feature_count_mismatch_rejected() {
        let (x, y) = separable_data();
        let mut model = GradientBoostingClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let wrong = Array2::zeros((1, 5));
        assert!(matches!(
            model.predict_proba(&wrong),
            Err(FraudGuardError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_serialization_round_trip_probabilities() {
        let (x, y) = separable_data();
        let mut model = GradientBoostingClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostingClassifier = serde_json::from_str(&json).unwrap();

        let before = model.predict_proba(&x).unwrap();
        let after = restored.predict_proba(&x).unwrap();
        for (u, v) in before.iter().zip(after.iter()) {
            assert_eq!(u, v);
        }
    }
}
