//! Training pipeline
//!
//! Sequential, offline, single pass: acquire the CSV, standardize the two
//! monetary/temporal columns, stratified 80/20 split, SMOTE-rebalance the
//! training partition, fit the boosted classifier, evaluate on the untouched
//! test partition, persist the bundle, and record the run.

use crate::artifact::{ModelBundle, ModelMetadata};
use crate::data::{self, FEATURE_COLUMNS, SCALED_COLUMNS};
use crate::error::{FraudGuardError, Result};
use crate::model::{EvalMetrics, GradientBoostingClassifier, GradientBoostingConfig};
use crate::preprocessing::StandardScaler;
use crate::sampling::Smote;
use crate::tracking::RunTracker;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// Fixed seed shared by the split, the resampler, and the classifier.
pub const RANDOM_SEED: u64 = 42;

/// Held-out fraction for the test partition.
pub const TEST_RATIO: f64 = 0.2;

/// Where the pipeline reads and writes.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub data_path: PathBuf,
    pub model_out: PathBuf,
    pub runs_dir: PathBuf,
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run_id: String,
    pub model_path: PathBuf,
    pub metrics: EvalMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub n_synthetic: usize,
}

/// Run the full training pipeline.
pub fn run_training(opts: &TrainingOptions) -> Result<TrainingOutcome> {
    info!(data = %opts.data_path.display(), "Starting training pipeline");

    data::ensure_dataset(&opts.data_path)?;
    let df = data::load_transactions(&opts.data_path)?;
    info!(rows = df.height(), columns = df.width(), "Dataset loaded");

    // Standardize Amount and Time; the fitted scaler ships with the model
    let mut scaler = StandardScaler::new();
    let df = scaler.fit_transform(&df, &SCALED_COLUMNS)?;

    let feature_names: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    let x = data::columns_to_array2(&df, &feature_names)?;
    let y = data::label_array(&df)?;

    let (x_train, x_test, y_train, y_test) = stratified_split(&x, &y, TEST_RATIO, RANDOM_SEED)?;
    info!(train = x_train.nrows(), test = x_test.nrows(), "Split complete");

    // Rebalance the training partition only
    let smote = Smote::new().with_k_neighbors(5).with_seed(RANDOM_SEED);
    let resampled = smote.fit_resample(&x_train, &y_train)?;
    info!(
        resampled = resampled.x.nrows(),
        synthetic = resampled.n_synthetic,
        "Training partition rebalanced"
    );

    let config = GradientBoostingConfig {
        random_state: Some(RANDOM_SEED),
        ..Default::default()
    };

    let mut tracker = RunTracker::start(&opts.runs_dir)?;
    let run_id = tracker.run_id().to_string();
    tracker.log_param("n_estimators", config.n_estimators);
    tracker.log_param("learning_rate", config.learning_rate);
    tracker.log_param("max_depth", config.max_depth);
    tracker.log_param("subsample", config.subsample);
    tracker.log_param("seed", RANDOM_SEED);
    tracker.log_param("smote_k_neighbors", 5);
    tracker.log_param("test_ratio", TEST_RATIO);

    let result = fit_and_persist(
        opts,
        &run_id,
        config,
        scaler,
        feature_names,
        &resampled.x,
        &resampled.y,
        &x_test,
        &y_test,
    );

    match result {
        Ok(metrics) => {
            tracker.log_metric("recall", metrics.recall);
            tracker.log_metric("auc", metrics.auc);
            tracker.log_artifact(&opts.model_out);
            tracker.finish()?;

            info!(
                run_id = %run_id,
                recall = metrics.recall,
                auc = metrics.auc,
                model = %opts.model_out.display(),
                "Training complete"
            );

            Ok(TrainingOutcome {
                run_id,
                model_path: opts.model_out.clone(),
                metrics,
                n_train: resampled.x.nrows(),
                n_test: x_test.nrows(),
                n_synthetic: resampled.n_synthetic,
            })
        }
        Err(e) => {
            let _ = tracker.fail();
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fit_and_persist(
    opts: &TrainingOptions,
    run_id: &str,
    config: GradientBoostingConfig,
    scaler: StandardScaler,
    feature_columns: Vec<String>,
    x_train: &Array2<f64>,
    y_train: &Array1<i64>,
    x_test: &Array2<f64>,
    y_test: &Array1<i64>,
) -> Result<EvalMetrics> {
    let y_train_f64: Array1<f64> = y_train.mapv(|v| v as f64);

    let mut classifier = GradientBoostingClassifier::new(config.clone());
    classifier.fit(x_train, &y_train_f64)?;
    info!(trees = config.n_estimators, "Classifier fitted");

    let probs = classifier.predict_proba(x_test)?;
    let metrics = EvalMetrics::compute(y_test, &probs);

    let bundle = ModelBundle {
        classifier,
        scaler,
        feature_columns,
        metadata: ModelMetadata {
            run_id: run_id.to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            params: config,
            metrics,
        },
    };
    bundle.save(&opts.model_out)?;

    Ok(metrics)
}

/// Stratified train/test split with a per-class seeded shuffle.
///
/// Classes are processed in sorted label order so a fixed seed yields
/// identical partitions across runs.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<i64>,
    test_ratio: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<i64>, Array1<i64>)> {
    if x.nrows() != y.len() {
        return Err(FraudGuardError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(FraudGuardError::ValidationError(format!(
            "test_ratio must be in [0, 1), got {}",
            test_ratio
        )));
    }

    let mut class_indices: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label).or_default().push(i);
    }

    let mut classes: Vec<i64> = class_indices.keys().copied().collect();
    classes.sort_unstable();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for class in classes {
        let mut indices = class_indices.remove(&class).unwrap();
        indices.shuffle(&mut rng);

        let test_size = ((indices.len() as f64) * test_ratio).round().max(1.0) as usize;
        let test_size = test_size.min(indices.len().saturating_sub(1));
        let split_point = indices.len() - test_size;

        train_indices.extend_from_slice(&indices[..split_point]);
        test_indices.extend_from_slice(&indices[split_point..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(FraudGuardError::DataError(
            "stratified split produced an empty partition".to_string(),
        ));
    }

    let n_cols = x.ncols();
    let x_train = Array2::from_shape_fn((train_indices.len(), n_cols), |(i, j)| {
        x[[train_indices[i], j]]
    });
    let x_test = Array2::from_shape_fn((test_indices.len(), n_cols), |(i, j)| {
        x[[test_indices[i], j]]
    });
    let y_train = Array1::from_iter(train_indices.iter().map(|&i| y[i]));
    let y_test = Array1::from_iter(test_indices.iter().map(|&i| y[i]));

    Ok((x_train, x_test, y_train, y_test))
}
