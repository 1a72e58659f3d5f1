//! PDF and OCR backend traits.
//!
//! Implementors provide the low-level, blocking steps; the orchestration
//! (fallback order, page caps, prompting) lives in
//! [`crate::extraction::StatementExtractor`].

pub mod mock;

use thiserror::Error;

/// Pages rasterized for the OCR fallback, whatever the document length.
pub const MAX_RENDER_PAGES: usize = 3;
/// Images fed to the OCR engine per document.
pub const MAX_OCR_PAGES: usize = 3;
/// Render zoom applied to every page.
pub const RENDER_SCALE: f32 = 1.5;

/// A rendered page, PNG-encoded.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number in the source document.
    pub page_number: usize,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("not a well-formed PDF: {0}")]
    Malformed(String),
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error("no page could be rendered")]
    NoRenderablePages,
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("could not run OCR tool: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("OCR failed on page {page}: {message}")]
    Tool { page: usize, message: String },
}

/// Text extraction and page rendering over an in-memory PDF.
pub trait PdfBackend: Send + Sync {
    /// Embedded text of every page. Empty or whitespace-only for scanned
    /// documents; `Malformed` if the buffer is not a PDF.
    fn extract_text(&self, data: &[u8]) -> Result<String, PdfError>;

    /// Render at most `max_pages` leading pages at `scale`. Pages that fail
    /// to render are skipped; `NoRenderablePages` only if none succeed.
    fn render_pages(
        &self,
        data: &[u8],
        max_pages: usize,
        scale: f32,
    ) -> Result<Vec<PageImage>, PdfError>;
}

/// Recognizes text in a single page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &PageImage) -> Result<String, OcrError>;
}

/// Run `engine` over the first [`MAX_OCR_PAGES`] images, in order, and join
/// the results with blank lines. The first failure aborts the whole run.
pub fn recognize_pages(engine: &dyn OcrEngine, images: &[PageImage]) -> Result<String, OcrError> {
    let total = images.len().min(MAX_OCR_PAGES);
    let mut blocks = Vec::with_capacity(total);

    for (i, image) in images.iter().take(MAX_OCR_PAGES).enumerate() {
        let text = engine.recognize(image)?;
        tracing::info!(
            page = image.page_number,
            progress = format!("{}/{}", i + 1, total),
            chars = text.chars().count(),
            "OCR page done"
        );
        blocks.push(text);
    }

    Ok(blocks.join("\n\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::mock::{MockOcr, page};
    use super::*;

    #[test]
    fn ocr_processes_at_most_three_images() {
        let images: Vec<PageImage> = (1..=10).map(page).collect();
        let ocr = MockOcr::new("строка");
        let text = recognize_pages(&ocr, &images).unwrap();
        assert_eq!(ocr.seen_pages(), vec![1, 2, 3]);
        assert_eq!(text, "строка\n\nстрока\n\nстрока");
    }

    #[test]
    fn ocr_failure_is_not_partial() {
        let images: Vec<PageImage> = (1..=3).map(page).collect();
        let ocr = MockOcr::new("ok").failing_on(2);
        let err = recognize_pages(&ocr, &images).unwrap_err();
        assert!(matches!(err, OcrError::Tool { page: 2, .. }));
    }

    #[test]
    fn blank_pages_trim_to_empty() {
        let images: Vec<PageImage> = (1..=2).map(page).collect();
        let ocr = MockOcr::new("  \n");
        assert_eq!(recognize_pages(&ocr, &images).unwrap(), "");
    }
}
