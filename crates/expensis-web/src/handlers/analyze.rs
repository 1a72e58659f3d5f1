use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use expensis_core::{AnalysisResult, validate_statement};

use crate::error::ApiError;
use crate::models::{AnalyzeRequest, Envelope};
use crate::state::AppState;

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Envelope<AnalysisResult>>, ApiError> {
    let Json(req) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(e.body_text())
        } else {
            ApiError::BadRequest(e.body_text())
        }
    })?;

    let records = validate_statement(&req.statement)?;
    tracing::info!(transactions = records.len(), "analyze request");

    let result = state.analyzer.analyze(records).await?;
    Ok(Json(Envelope::ok(result)))
}
