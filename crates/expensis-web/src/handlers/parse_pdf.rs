use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};

use crate::error::ApiError;
use crate::models::{Envelope, ParsedPdf};
use crate::state::AppState;
use crate::upload::parse_multipart;

pub async fn parse_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Envelope<ParsedPdf>>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let file = parse_multipart(multipart, state.max_upload_bytes).await?;

    let extracted = state.extractor.extract(file.data).await?;
    tracing::info!(
        filename = %file.filename,
        transactions = extracted.transactions.len(),
        method = %extracted.method,
        "PDF parsed"
    );

    let extracted_text = extracted.preview();
    Ok(Json(Envelope::ok(ParsedPdf {
        transactions_count: extracted.transactions.len(),
        method: extracted.method,
        extracted_text,
        statement: extracted.transactions,
    })))
}
