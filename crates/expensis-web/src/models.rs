use serde::{Deserialize, Serialize};
use serde_json::Value;

use expensis_core::{ExtractionMethod, Transaction};

/// Body of `POST /analyze`. The statement stays raw JSON so shape errors
/// are reported by validation rather than by the extractor.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub statement: Value,
}

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPdf {
    pub statement: Vec<Transaction>,
    /// Leading part of the source text.
    pub extracted_text: String,
    pub transactions_count: usize,
    pub method: ExtractionMethod,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
