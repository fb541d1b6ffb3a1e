
use base64::prelude::*;
use calamine::{Reader, open_workbook_auto};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::ingest::ocr::TextRecognition;
use crate::{DocuSenseError, Result};

/// Data rows kept from tabular files, after the header
pub const TABLE_PREVIEW_ROWS: usize = 5;

/// Side length images are resized to before description
pub const IMAGE_SIZE: u32 = 512;

/// Supported input formats, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Csv,
    Spreadsheet,
    Image,
}

impl FileKind {
    /// Match the extension case-insensitively
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Spreadsheet),
            "png" | "jpg" | "jpeg" | "gif" => Ok(Self::Image),
            _ => Err(DocuSenseError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: extension.to_string(),
            }),
        }
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Text => "Text",
            Self::Csv => "CSV",
            Self::Spreadsheet => "Excel",
            Self::Image => "Image",
        }
    }
}

/// What a file contributes to its description request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub kind: FileKind,
    /// Labelled text; for images, the file name plus any recognised text
    pub text: String,
    /// `data:image/jpeg;base64,...` URL for images
    pub image: Option<String>,
}

/// Read the file and render it for the describing model
///
/// Images are passed through `ocr` when one is given.
#[inline]
pub async fn extract(
    path: &Path,
    ocr: Option<Arc<dyn TextRecognition>>,
) -> Result<ExtractedContent> {
    let kind = FileKind::from_path(path)?;
    debug!("Extracting {} content from {}", kind.label(), path.display());

    let owned = path.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || extract_blocking(&owned, kind, ocr))
        .await
        .map_err(|e| extraction_error(path, format!("extraction task failed: {}", e)))??;

    Ok(extracted)
}

fn extract_blocking(
    path: &Path,
    kind: FileKind,
    ocr: Option<Arc<dyn TextRecognition>>,
) -> Result<ExtractedContent> {
    let (text, image) = match kind {
        FileKind::Pdf => (labelled(path, kind, &extract_pdf(path)?), None),
        FileKind::Text => (labelled(path, kind, &extract_text(path)?), None),
        FileKind::Csv => (labelled(path, kind, &extract_csv(path)?), None),
        FileKind::Spreadsheet => (labelled(path, kind, &extract_spreadsheet(path)?), None),
        FileKind::Image => {
            let resized = load_resized_image(path)?;
            let recognized = match ocr {
                Some(ocr) => ocr
                    .recognize(&resized)
                    .map_err(|e| extraction_error(path, format!("OCR failed: {:#}", e)))?,
                None => String::new(),
            };
            let text = match recognized.trim() {
                "" => format!("{} file name: {}", kind.label(), file_stem(path)),
                content => labelled(path, kind, content),
            };
            (text, Some(encode_jpeg(path, resized)?))
        }
    };

    Ok(ExtractedContent { kind, text, image })
}

fn labelled(path: &Path, kind: FileKind, content: &str) -> String {
    format!(
        "{} file name: {}\nContent: {}",
        kind.label(),
        file_stem(path),
        content
    )
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extraction_error(path: &Path, message: impl Into<String>) -> DocuSenseError {
    DocuSenseError::Extraction {
        path: PathBuf::from(path),
        message: message.into(),
    }
}

/// `pdf-extract` panics on some malformed font encodings, so the panic is caught
fn extract_pdf(path: &Path) -> Result<String> {
    let owned = path.to_path_buf();
    match std::panic::catch_unwind(|| pdf_extract::extract_text(&owned)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(extraction_error(path, e.to_string())),
        Err(_panic) => Err(extraction_error(
            path,
            "PDF parsing panicked (likely malformed font encoding)",
        )),
    }
}

fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| extraction_error(path, e.to_string()))
}

fn extract_csv(path: &Path) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| extraction_error(path, e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| extraction_error(path, e.to_string()))?
        .clone();

    let mut lines = vec![headers.iter().collect::<Vec<_>>().join("\t")];
    for record in reader.records().take(TABLE_PREVIEW_ROWS) {
        let record = record.map_err(|e| extraction_error(path, e.to_string()))?;
        lines.push(record.iter().collect::<Vec<_>>().join("\t"));
    }

    Ok(lines.join("\n"))
}

fn extract_spreadsheet(path: &Path) -> Result<String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| extraction_error(path, e.to_string()))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| extraction_error(path, "workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| extraction_error(path, e.to_string()))?;

    let lines: Vec<String> = range
        .rows()
        .filter(|row| row.iter().any(|cell| !cell.to_string().is_empty()))
        .take(TABLE_PREVIEW_ROWS + 1)
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect();

    Ok(lines.join("\n"))
}

fn load_resized_image(path: &Path) -> Result<RgbImage> {
    let decoded = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| extraction_error(path, format!("image decode failed: {}", e)))?;

    Ok(decoded
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle)
        .to_rgb8())
}

fn encode_jpeg(path: &Path, image: RgbImage) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| extraction_error(path, format!("JPEG encoding failed: {}", e)))?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        BASE64_STANDARD.encode(buffer.into_inner())
    ))
}
