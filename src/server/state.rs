//! Application state

use crate::artifact::ModelBundle;
use std::sync::Arc;
use tracing::{info, warn};

use super::ServerConfig;

/// State shared across request handlers.
///
/// The model reference has exactly two states: `None` (load failed at
/// startup, terminal) and `Some` (loaded at startup, immutable for the
/// process lifetime). Read-only after construction, so handlers share it
/// through `Arc` without locking.
pub struct AppState {
    model: Option<Arc<ModelBundle>>,
}

impl AppState {
    /// Load the bundle from the configured path. A missing or unreadable
    /// model leaves the server running in a degraded state where `/predict`
    /// answers 503 but liveness still works.
    pub fn load(config: &ServerConfig) -> Self {
        match ModelBundle::load(&config.model_path) {
            Ok(bundle) => {
                info!(
                    path = %config.model_path.display(),
                    run_id = %bundle.metadata.run_id,
                    trained_at = %bundle.metadata.trained_at,
                    "Model loaded"
                );
                Self {
                    model: Some(Arc::new(bundle)),
                }
            }
            Err(e) => {
                warn!(
                    path = %config.model_path.display(),
                    error = %e,
                    "Model could not be loaded; /predict will answer 503"
                );
                Self { model: None }
            }
        }
    }

    /// State with an explicit bundle, used by tests to substitute models.
    pub fn with_model(bundle: ModelBundle) -> Self {
        Self {
            model: Some(Arc::new(bundle)),
        }
    }

    /// State with no model loaded.
    pub fn unloaded() -> Self {
        Self { model: None }
    }

    pub fn model(&self) -> Option<&Arc<ModelBundle>> {
        self.model.as_ref()
    }
}
