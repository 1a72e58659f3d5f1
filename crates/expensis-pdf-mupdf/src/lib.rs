use mupdf::{Colorspace, Document, ImageFormat, Matrix, TextPageFlags};

use expensis_core::{PageImage, PdfBackend, PdfError};

/// Bytes searched for the `%PDF-` header. Some producers prepend junk.
const MAGIC_WINDOW: usize = 1024;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island; it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the analysis paths do not transitively
/// depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn open(data: &[u8]) -> Result<Document, PdfError> {
    let window = &data[..data.len().min(MAGIC_WINDOW)];
    if !window.windows(5).any(|w| w == b"%PDF-") {
        return Err(PdfError::Malformed("missing %PDF- header".into()));
    }
    Document::from_bytes(data, "application/pdf").map_err(|e| PdfError::Malformed(e.to_string()))
}

impl PdfBackend for MupdfBackend {
    fn extract_text(&self, data: &[u8]) -> Result<String, PdfError> {
        let document = open(data)?;

        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| PdfError::Extraction(e.to_string()))?
        {
            let page = page_result.map_err(|e| PdfError::Extraction(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| PdfError::Extraction(e.to_string()))?;

            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }
            pages_text.push(page_text);
        }

        Ok(pages_text.join("\n"))
    }

    fn render_pages(
        &self,
        data: &[u8],
        max_pages: usize,
        scale: f32,
    ) -> Result<Vec<PageImage>, PdfError> {
        let document = open(data)?;
        let page_count = document
            .page_count()
            .map_err(|e| PdfError::Extraction(e.to_string()))?;
        let page_count = usize::try_from(page_count).unwrap_or(0);

        if page_count == 0 {
            return Ok(Vec::new());
        }

        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();
        let mut images = Vec::new();

        for index in 0..page_count.min(max_pages) {
            match render_page(&document, index, &matrix, &colorspace) {
                Ok(image) => images.push(image),
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "skipping page that failed to render")
                }
            }
        }

        if images.is_empty() {
            return Err(PdfError::NoRenderablePages);
        }
        Ok(images)
    }
}

fn render_page(
    document: &Document,
    index: usize,
    matrix: &Matrix,
    colorspace: &Colorspace,
) -> Result<PageImage, mupdf::Error> {
    let page = document.load_page(index as i32)?;
    let pixmap = page.to_pixmap(matrix, colorspace, false, false)?;

    let mut png = Vec::new();
    pixmap.write_to(&mut png, ImageFormat::PNG)?;

    Ok(PageImage {
        page_number: index + 1,
        png,
        width: pixmap.width(),
        height: pixmap.height(),
    })
}
