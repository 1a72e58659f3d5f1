//! PDF statement → normalized transactions.
//!
//! Text layer first; scanned documents fall back to rendering the leading
//! pages and running OCR. Either way the text goes to the model once, and
//! whatever array comes back is normalized.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{
    MAX_RENDER_PAGES, OcrEngine, OcrError, PdfBackend, PdfError, RENDER_SCALE, recognize_pages,
};
use crate::llm::{ChatMessage, CompletionClient, CompletionError};
use crate::prompts::{self, EXTRACTION_TEMPERATURE, truncate_chars};
use crate::{ExtractionMethod, Transaction, fields, interpret};

/// Characters of source text echoed back to the caller.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("could not read PDF: {0}")]
    ExtractionFailed(#[source] PdfError),
    #[error("could not render PDF pages: {0}")]
    Render(#[source] PdfError),
    #[error("PDF has no text layer and no renderable pages")]
    NoContent,
    #[error("OCR failed: {0}")]
    OcrFailed(#[from] OcrError),
    #[error("OCR recognized no text")]
    NoTextRecognized,
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("no transactions could be extracted from the statement")]
    NoTransactionsExtracted,
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl ExtractionError {
    /// Whether the failure is due to the uploaded document rather than to
    /// the service or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractionError::ExtractionFailed(_)
                | ExtractionError::NoContent
                | ExtractionError::NoTextRecognized
                | ExtractionError::NoTransactionsExtracted
        )
    }
}

/// Transactions pulled out of a PDF, tagged with how the text was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStatement {
    pub transactions: Vec<Transaction>,
    pub source_text: String,
    pub method: ExtractionMethod,
}

impl ExtractedStatement {
    /// Leading [`PREVIEW_CHARS`] characters of the source text.
    pub fn preview(&self) -> String {
        truncate_chars(&self.source_text, PREVIEW_CHARS)
    }
}

pub struct StatementExtractor {
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrEngine>,
    llm: Arc<dyn CompletionClient>,
}

impl StatementExtractor {
    pub fn new(
        pdf: Arc<dyn PdfBackend>,
        ocr: Arc<dyn OcrEngine>,
        llm: Arc<dyn CompletionClient>,
    ) -> Self {
        Self { pdf, ocr, llm }
    }

    /// Run the full pipeline over an in-memory PDF.
    pub async fn extract(&self, data: Vec<u8>) -> Result<ExtractedStatement, ExtractionError> {
        let data: Arc<[u8]> = data.into();

        let pdf = Arc::clone(&self.pdf);
        let bytes = Arc::clone(&data);
        let text = blocking(move || pdf.extract_text(&bytes))
            .await?
            .map_err(ExtractionError::ExtractionFailed)?;

        if !text.trim().is_empty() {
            tracing::info!(chars = text.chars().count(), "using embedded PDF text");
            return self.describe(text, ExtractionMethod::Text).await;
        }

        tracing::info!("PDF has no text layer, rendering pages for OCR");
        let pdf = Arc::clone(&self.pdf);
        let bytes = Arc::clone(&data);
        let mut images = blocking(move || pdf.render_pages(&bytes, MAX_RENDER_PAGES, RENDER_SCALE))
            .await?
            .map_err(ExtractionError::Render)?;
        images.truncate(MAX_RENDER_PAGES);

        if images.is_empty() {
            return Err(ExtractionError::NoContent);
        }
        tracing::info!(pages = images.len(), "pages rendered");

        let ocr = Arc::clone(&self.ocr);
        let text = blocking(move || recognize_pages(ocr.as_ref(), &images)).await??;

        if text.trim().is_empty() {
            return Err(ExtractionError::NoTextRecognized);
        }
        tracing::info!(chars = text.chars().count(), "OCR text recognized");

        self.describe(text, ExtractionMethod::Ocr).await
    }

    /// Ask the model for transactions in `text` and normalize the reply.
    async fn describe(
        &self,
        text: String,
        method: ExtractionMethod,
    ) -> Result<ExtractedStatement, ExtractionError> {
        let prompt = match method {
            ExtractionMethod::Text => prompts::text_extraction(&text),
            ExtractionMethod::Ocr => prompts::ocr_extraction(&text),
        };
        let messages = [ChatMessage::user(prompt)];
        let reply = self.llm.complete(&messages, EXTRACTION_TEMPERATURE).await?;

        let entries = interpret::json_array(&reply).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                reply = %truncate_chars(&reply, PREVIEW_CHARS),
                "extraction reply had no usable array"
            );
            Vec::new()
        });

        let transactions = fields::normalize_extracted(&entries);
        if transactions.is_empty() {
            return Err(ExtractionError::NoTransactionsExtracted);
        }

        tracing::info!(
            count = transactions.len(),
            dropped = entries.len() - transactions.len(),
            method = %method,
            "transactions extracted"
        );

        Ok(ExtractedStatement {
            transactions,
            source_text: text,
            method,
        })
    }
}

/// Run blocking backend work (MuPDF, tesseract) off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))
}
