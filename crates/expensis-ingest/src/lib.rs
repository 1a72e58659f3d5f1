use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use expensis_core::statement::{self, LoadError};
use expensis_core::{CompletionClient, Config, PdfBackend, StatementExtractor};

pub mod tesseract;

pub use tesseract::TesseractOcr;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of expensis-ingest)")]
    NoPdfSupport,
}

/// A statement file, either already tabular or a PDF still to be extracted.
#[derive(Debug)]
pub enum StatementInput {
    Records(Vec<Value>),
    Pdf(Vec<u8>),
}

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Read a statement file.
///
/// Dispatches on file extension:
/// - `.pdf` → raw bytes for [`StatementExtractor`]
/// - `.json` / `.csv` → records via [`statement::load_statement`]
pub fn read_statement(path: &Path) -> Result<StatementInput, IngestError> {
    if is_pdf_path(path) {
        let data = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(StatementInput::Pdf(data));
    }
    Ok(StatementInput::Records(statement::load_statement(path)?))
}

#[cfg(feature = "pdf")]
pub fn pdf_backend() -> Result<Arc<dyn PdfBackend>, IngestError> {
    Ok(Arc::new(expensis_pdf_mupdf::MupdfBackend::new()))
}

#[cfg(not(feature = "pdf"))]
pub fn pdf_backend() -> Result<Arc<dyn PdfBackend>, IngestError> {
    Err(IngestError::NoPdfSupport)
}

/// The production extractor: MuPDF for text and rendering, tesseract for OCR.
pub fn default_extractor(
    config: &Config,
    llm: Arc<dyn CompletionClient>,
) -> Result<StatementExtractor, IngestError> {
    let ocr = TesseractOcr::new(&config.tesseract_path, &config.ocr_languages);
    if !ocr.is_available() {
        tracing::warn!(
            binary = %config.tesseract_path.display(),
            languages = ocr.languages(),
            "tesseract not found; scanned statements will fail"
        );
    }
    Ok(StatementExtractor::new(pdf_backend()?, Arc::new(ocr), llm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pdf_detection_is_case_insensitive() {
        assert!(is_pdf_path(Path::new("statement.PDF")));
        assert!(!is_pdf_path(Path::new("statement.csv")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn csv_files_load_as_records() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "дата,сумма,операция,детали").unwrap();
        writeln!(file, "2024-01-15,-1500,Покупка,Ашан").unwrap();

        match read_statement(file.path()).unwrap() {
            StatementInput::Records(records) => assert_eq!(records.len(), 1),
            StatementInput::Pdf(_) => panic!("expected records"),
        }
    }

    #[test]
    fn pdf_files_load_as_bytes() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.7").unwrap();

        match read_statement(file.path()).unwrap() {
            StatementInput::Pdf(data) => assert_eq!(data, b"%PDF-1.7"),
            StatementInput::Records(_) => panic!("expected PDF bytes"),
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_statement(Path::new("statement.xlsx")).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Load(LoadError::UnsupportedFormat(_))
        ));
    }
}
