//! Gradient-boosted fraud classifier
//!
//! A native implementation of gradient boosted decision trees for binary
//! classification against a log-loss objective, plus the evaluation metrics
//! reported by the training pipeline.

pub mod gradient_boosting;
pub mod metrics;
pub mod tree;

pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use metrics::{recall_score, roc_auc_score, EvalMetrics};
pub use tree::RegressionTree;
