//! Experiment tracking
//!
//! A local filesystem store recording one directory per training run:
//! params, metrics, artifact paths, and timestamps in `run.json`, with an
//! `index.json` at the root listing run ids in creation order.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Lifecycle of a tracked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Everything recorded about a single training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
}

/// Tracker for one run. Created at pipeline start, finished (or failed) at
/// the end; the record is only written to disk on completion.
pub struct RunTracker {
    base_dir: PathBuf,
    record: RunRecord,
}

impl RunTracker {
    /// Start a new run under `base_dir`, creating the directory structure.
    pub fn start(base_dir: &Path) -> Result<Self> {
        let run_id = generate_run_id();
        fs::create_dir_all(base_dir.join(&run_id))?;

        info!(run_id = %run_id, dir = %base_dir.display(), "Tracking run started");

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            record: RunRecord {
                run_id,
                started_at: chrono::Utc::now().to_rfc3339(),
                ended_at: None,
                status: RunStatus::Running,
                params: BTreeMap::new(),
                metrics: BTreeMap::new(),
                artifacts: Vec::new(),
            },
        })
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn log_param(&mut self, key: &str, value: impl ToString) {
        self.record.params.insert(key.to_string(), value.to_string());
    }

    pub fn log_metric(&mut self, key: &str, value: f64) {
        self.record.metrics.insert(key.to_string(), value);
    }

    pub fn log_artifact(&mut self, path: &Path) {
        self.record.artifacts.push(path.display().to_string());
    }

    /// Mark the run finished and persist it. Returns the run directory.
    pub fn finish(self) -> Result<PathBuf> {
        self.close(RunStatus::Finished)
    }

    /// Mark the run failed and persist it.
    pub fn fail(self) -> Result<PathBuf> {
        self.close(RunStatus::Failed)
    }

    fn close(mut self, status: RunStatus) -> Result<PathBuf> {
        self.record.status = status;
        self.record.ended_at = Some(chrono::Utc::now().to_rfc3339());

        let run_dir = self.base_dir.join(&self.record.run_id);
        fs::create_dir_all(&run_dir)?;
        let json = serde_json::to_string_pretty(&self.record)?;
        fs::write(run_dir.join("run.json"), json)?;

        append_to_index(&self.base_dir, &self.record.run_id)?;

        info!(run_id = %self.record.run_id, status = ?status, "Tracking run closed");
        Ok(run_dir)
    }
}

/// Load a recorded run by id.
pub fn load_run(base_dir: &Path, run_id: &str) -> Result<RunRecord> {
    let json = fs::read_to_string(base_dir.join(run_id).join("run.json"))?;
    let record: RunRecord = serde_json::from_str(&json)?;
    Ok(record)
}

/// Run ids in creation order.
pub fn list_runs(base_dir: &Path) -> Result<Vec<String>> {
    let index_path = base_dir.join("index.json");
    if !index_path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(index_path)?;
    let ids: Vec<String> = serde_json::from_str(&json)?;
    Ok(ids)
}

fn append_to_index(base_dir: &Path, run_id: &str) -> Result<()> {
    let mut ids = list_runs(base_dir)?;
    ids.push(run_id.to_string());
    let json = serde_json::to_string_pretty(&ids)?;
    fs::write(base_dir.join("index.json"), json)?;
    Ok(())
}

fn generate_run_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
