use expensis_core::{Analyzer, StatementExtractor};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub extractor: StatementExtractor,
    pub analyzer: Analyzer,
    /// Largest accepted file, in bytes.
    pub max_upload_bytes: usize,
}
