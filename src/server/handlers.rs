//! HTTP request handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::data::TransactionRecord;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Response for a scored transaction.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub is_fraud: u8,
    pub fraud_probability: f64,
}

/// Score one transaction against the loaded model.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(transaction): Json<TransactionRecord>,
) -> Result<Json<PredictResponse>> {
    let bundle = state.model().ok_or(ServerError::ModelUnavailable)?;

    let probability = bundle
        .fraud_probability(&transaction)
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    let flagged = probability > 0.5;
    debug!(probability, flagged, "Transaction scored");

    Ok(Json(PredictResponse {
        is_fraud: u8::from(flagged),
        fraud_probability: probability,
    }))
}

/// Liveness probe; answers regardless of model state.
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "API is running" }))
}
