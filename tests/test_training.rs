//! Integration test: training pipeline end-to-end

use fraudguard::data::{FEATURE_COLUMNS, LABEL_COLUMN};
use fraudguard::pipeline::{run_training, TrainingOptions};
use fraudguard::prelude::*;
use fraudguard::tracking;
use std::io::Write;
use std::path::Path;

/// Write a synthetic labeled CSV in the creditcard.csv shape: 60 legitimate
/// rows near the origin and 12 fraud rows shifted well away from them, with
/// deterministic values so repeated runs see identical data.
fn write_synthetic_csv(path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();

    let header: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(LABEL_COLUMN))
        .collect();
    writeln!(file, "{}", header.join(",")).unwrap();

    for i in 0..72 {
        let is_fraud = i % 6 == 5; // 12 of 72 rows
        let shift = if is_fraud { 8.0 } else { 0.0 };

        let mut row: Vec<String> = Vec::with_capacity(31);
        // Time
        row.push(format!("{}", i as f64 * 100.0));
        // V1..V28: small deterministic wiggle around the class center
        for j in 0..28 {
            let wiggle = ((i * 31 + j * 7) % 11) as f64 / 10.0;
            row.push(format!("{}", shift + wiggle));
        }
        // Amount
        row.push(format!("{}", 10.0 + (i % 9) as f64 * 25.0));
        // Class
        row.push(format!("{}", u8::from(is_fraud)));
        writeln!(file, "{}", row.join(",")).unwrap();
    }
}

fn train_once(dir: &Path) -> TrainingOutcomeParts {
    let data_path = dir.join("creditcard.csv");
    write_synthetic_csv(&data_path);

    let opts = TrainingOptions {
        data_path,
        model_out: dir.join("model.json"),
        runs_dir: dir.join("runs"),
    };
    let outcome = run_training(&opts).unwrap();

    TrainingOutcomeParts {
        run_id: outcome.run_id,
        model_path: outcome.model_path,
        recall: outcome.metrics.recall,
        auc: outcome.metrics.auc,
        n_train: outcome.n_train,
        n_test: outcome.n_test,
        n_synthetic: outcome.n_synthetic,
        runs_dir: opts_runs_dir(dir),
    }
}

fn opts_runs_dir(dir: &Path) -> std::path::PathBuf {
    dir.join("runs")
}

struct TrainingOutcomeParts {
    run_id: String,
    model_path: std::path::PathBuf,
    recall: f64,
    auc: f64,
    n_train: usize,
    n_test: usize,
    n_synthetic: usize,
    runs_dir: std::path::PathBuf,
}

#[test]
fn test_pipeline_produces_model_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_once(dir.path());

    assert!(outcome.model_path.exists(), "model bundle should be written");
    assert!((0.0..=1.0).contains(&outcome.recall));
    assert!((0.0..=1.0).contains(&outcome.auc));
    // 72 rows at 80/20: 58 train + 14 test; SMOTE balances train to 48+48
    assert_eq!(outcome.n_test, 14);
    assert_eq!(outcome.n_train, 96);
    assert_eq!(outcome.n_synthetic, 38);

    // Cleanly separated classes should be learned well
    assert!(outcome.auc > 0.9, "AUC {} too low for separable data", outcome.auc);
    assert!(outcome.recall > 0.5, "recall {} too low for separable data", outcome.recall);
}

#[test]
fn test_pipeline_is_deterministic_for_fixed_seed() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let a = train_once(dir_a.path());
    let b = train_once(dir_b.path());

    assert_eq!(a.recall, b.recall);
    assert_eq!(a.auc, b.auc);
    assert_eq!(a.n_train, b.n_train);
    assert_eq!(a.n_synthetic, b.n_synthetic);

    // The persisted models must score identically
    let bundle_a = ModelBundle::load(&a.model_path).unwrap();
    let bundle_b = ModelBundle::load(&b.model_path).unwrap();
    let record = sample_record(3.0);
    assert_eq!(
        bundle_a.fraud_probability(&record).unwrap(),
        bundle_b.fraud_probability(&record).unwrap()
    );
}

#[test]
fn test_resampled_training_set_is_balanced() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_once(dir.path());

    // Post-SMOTE class-1 count equals class-0 count: train split holds
    // 48 legitimate and 10 fraud rows, so 38 synthetics even them out
    assert_eq!(outcome.n_train, 2 * 48);
    assert_eq!(outcome.n_synthetic, 48 - 10);
}

#[test]
fn test_run_is_tracked_with_params_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_once(dir.path());

    let runs = tracking::list_runs(&outcome.runs_dir).unwrap();
    assert_eq!(runs, vec![outcome.run_id.clone()]);

    let record = tracking::load_run(&outcome.runs_dir, &outcome.run_id).unwrap();
    assert_eq!(record.status, tracking::RunStatus::Finished);
    assert_eq!(record.params.get("n_estimators").unwrap(), "200");
    assert_eq!(record.params.get("learning_rate").unwrap(), "0.1");
    assert_eq!(record.params.get("max_depth").unwrap(), "5");
    assert_eq!(*record.metrics.get("recall").unwrap(), outcome.recall);
    assert_eq!(*record.metrics.get("auc").unwrap(), outcome.auc);
    assert_eq!(record.artifacts.len(), 1);
    assert!(record.artifacts[0].ends_with("model.json"));
}

#[test]
fn test_bundle_records_schema_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_once(dir.path());

    let bundle = ModelBundle::load(&outcome.model_path).unwrap();
    let expected: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    assert_eq!(bundle.feature_columns, expected);
    assert!(bundle.scaler.is_fitted());
    assert_eq!(bundle.metadata.run_id, outcome.run_id);
    assert_eq!(bundle.metadata.params.n_estimators, 200);
    assert_eq!(bundle.metadata.params.max_depth, 5);
    assert_eq!(bundle.metadata.metrics.recall, outcome.recall);
}

#[test]
fn test_missing_dataset_without_downloader_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let opts = TrainingOptions {
        data_path: dir.path().join("does-not-exist.csv"),
        model_out: dir.path().join("model.json"),
        runs_dir: dir.path().join("runs"),
    };
    // Either the kaggle CLI is absent or the download cannot produce this
    // file; both are fatal for the run
    assert!(run_training(&opts).is_err());
    assert!(!opts.model_out.exists());
}

fn sample_record(fill: f64) -> TransactionRecord {
    let mut map = serde_json::Map::new();
    for col in FEATURE_COLUMNS {
        map.insert(col.to_string(), serde_json::json!(fill));
    }
    serde_json::from_value(serde_json::Value::Object(map)).unwrap()
}
