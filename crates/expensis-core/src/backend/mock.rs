//! In-memory PDF and OCR backends for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{OcrEngine, OcrError, PageImage, PdfBackend, PdfError};

/// A fake page image; the bytes are not a real PNG.
pub fn page(page_number: usize) -> PageImage {
    PageImage {
        page_number,
        png: vec![0x89, b'P', b'N', b'G'],
        width: 1,
        height: 1,
    }
}

/// A [`PdfBackend`] with a fixed text layer and page count.
pub struct MockPdfBackend {
    text: String,
    page_count: usize,
    malformed: bool,
    render_failure: bool,
    render_calls: AtomicUsize,
    last_max_pages: AtomicUsize,
}

impl MockPdfBackend {
    /// A document whose pages carry `text`.
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            page_count: 1,
            malformed: false,
            render_failure: false,
            render_calls: AtomicUsize::new(0),
            last_max_pages: AtomicUsize::new(0),
        }
    }

    /// A scanned document: no text layer, `page_count` renderable pages.
    pub fn scanned(page_count: usize) -> Self {
        Self {
            page_count,
            ..Self::with_text("")
        }
    }

    /// Every call fails as if the buffer were not a PDF.
    pub fn malformed() -> Self {
        Self {
            malformed: true,
            ..Self::with_text("")
        }
    }

    /// Rendering fails for every page.
    pub fn unrenderable(mut self) -> Self {
        self.render_failure = true;
        self
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    /// `max_pages` passed to the last render call.
    pub fn last_max_pages(&self) -> usize {
        self.last_max_pages.load(Ordering::SeqCst)
    }
}

impl PdfBackend for MockPdfBackend {
    fn extract_text(&self, _data: &[u8]) -> Result<String, PdfError> {
        if self.malformed {
            return Err(PdfError::Malformed("mock".into()));
        }
        Ok(self.text.clone())
    }

    /// Deliberately ignores `max_pages` so callers' own caps are exercised.
    fn render_pages(
        &self,
        _data: &[u8],
        max_pages: usize,
        _scale: f32,
    ) -> Result<Vec<PageImage>, PdfError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_pages.store(max_pages, Ordering::SeqCst);
        if self.malformed {
            return Err(PdfError::Malformed("mock".into()));
        }
        if self.render_failure {
            return Err(PdfError::NoRenderablePages);
        }
        Ok((1..=self.page_count).map(page).collect())
    }
}

/// An [`OcrEngine`] returning fixed text and recording which pages it saw.
pub struct MockOcr {
    text: String,
    fail_on: Option<usize>,
    seen: Mutex<Vec<usize>>,
}

impl MockOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail_on: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fail when asked to recognize `page_number`.
    pub fn failing_on(mut self, page_number: usize) -> Self {
        self.fail_on = Some(page_number);
        self
    }

    pub fn seen_pages(&self) -> Vec<usize> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OcrEngine for MockOcr {
    fn recognize(&self, image: &PageImage) -> Result<String, OcrError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(image.page_number);
        }
        if self.fail_on == Some(image.page_number) {
            return Err(OcrError::Tool {
                page: image.page_number,
                message: "mock failure".into(),
            });
        }
        Ok(self.text.clone())
    }
}
