use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod backend;
pub mod config_file;
pub mod extraction;
pub mod fields;
pub mod interpret;
pub mod llm;
pub mod model;
pub mod prompts;
pub mod statement;
pub mod stats;

// Re-export for convenience
pub use analysis::{AnalysisError, Analyzer, validate_statement};
pub use backend::{MAX_OCR_PAGES, MAX_RENDER_PAGES, OcrEngine, OcrError, PageImage, PdfBackend, PdfError};
pub use extraction::{ExtractedStatement, ExtractionError, StatementExtractor};
pub use interpret::InterpretError;
pub use llm::{ChatClient, ChatMessage, CompletionClient, CompletionError, Role};
pub use model::{
    AnalysisResult, Classification, Forecast, ForecastMonth, Frequency, Priority, Recommendation,
    RecommendationType, SubscriptionRecord,
};
pub use stats::Statistics;

/// A single statement line, normalized from whatever field spellings the
/// source used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: String,
    /// Signed amount; negative values are expenses.
    pub amount: f64,
    pub operation_type: String,
    pub details: String,
}

/// How the text of a PDF statement was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Embedded text layer.
    Text,
    /// Rendered page images run through OCR.
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Text => "text",
            ExtractionMethod::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_OCR_LANGUAGES: &str = "rus+eng";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Resolved runtime configuration.
///
/// Built by [`config_file::resolve`] from the TOML cascade and the process
/// environment.
#[derive(Clone)]
pub struct Config {
    /// Chat-completion endpoint, e.g. `https://api.deepseek.com/chat/completions`.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    /// Tesseract language hypothesis (`-l` argument).
    pub ocr_languages: String,
    pub tesseract_path: PathBuf,
    pub port: u16,
    pub max_upload_mb: usize,
    /// Per-request timeout for completion calls. `None` keeps the transport default.
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("ocr_languages", &self.ocr_languages)
            .field("tesseract_path", &self.tesseract_path)
            .field("port", &self.port)
            .field("max_upload_mb", &self.max_upload_mb)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            port: DEFAULT_PORT,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Upload cap in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            api_key: Some("sk-secret".into()),
            ..Config::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn transaction_serializes_camel_case() {
        let tx = Transaction {
            date: "2024-01-15".into(),
            amount: -1500.0,
            operation_type: "Покупка".into(),
            details: "Супермаркет".into(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["operationType"], "Покупка");
        assert_eq!(value["amount"], -1500.0);
    }

    #[test]
    fn extraction_method_is_lowercase_on_the_wire() {
        assert_eq!(serde_json::to_value(ExtractionMethod::Ocr).unwrap(), "ocr");
        assert_eq!(ExtractionMethod::Text.to_string(), "text");
    }
}
