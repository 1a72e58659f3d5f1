//! OCR through the `tesseract` command-line tool.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use expensis_core::{OcrEngine, OcrError, PageImage};

/// Runs `tesseract <image> stdout -l <languages>` once per page, on a
/// temporary PNG file.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    /// Whether the binary can be spawned at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

fn build_args(image: &Path, languages: &str) -> Vec<OsString> {
    vec![
        image.as_os_str().to_os_string(),
        "stdout".into(),
        "-l".into(),
        languages.into(),
    ]
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &PageImage) -> Result<String, OcrError> {
        let mut file = tempfile::Builder::new()
            .prefix("expensis-ocr-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&image.png)?;
        file.flush()?;

        let output = Command::new(&self.binary)
            .args(build_args(file.path(), &self.languages))
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Tool {
                page: image.page_number,
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
