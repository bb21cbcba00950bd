pub mod dates;
pub mod engine;
pub mod preprocess;
pub mod setup;

pub use dates::{contains_marker, flatten_text, parse_numeric_date, parse_prose_date};
pub use engine::{OcrRequest, PageSegmentation, Tesseract, TextRecognizer};
pub use preprocess::{binarize_dark_text, crop_rect, to_ocr_input};
pub use setup::ensure_tesseract;

use image::RgbaImage;

use crate::error::OcrError;
use crate::geometry::PixelRect;

/// Crops a region, preprocesses it, and runs OCR on it.
///
/// Returns `Ok(None)` when the region lies entirely outside the image.
pub fn recognize_region<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    img: &RgbaImage,
    rect: &PixelRect,
    request: &OcrRequest<'_>,
    binarize_threshold: Option<u8>,
) -> Result<Option<String>, OcrError> {
    let Some(cropped) = crop_rect(img, rect) else {
        return Ok(None);
    };
    let prepared = to_ocr_input(&cropped, binarize_threshold);
    recognizer.recognize(&prepared, request).map(Some)
}

/// Runs OCR over the whole image.
pub fn recognize_page<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    img: &RgbaImage,
    request: &OcrRequest<'_>,
    binarize_threshold: Option<u8>,
) -> Result<String, OcrError> {
    let prepared = to_ocr_input(img, binarize_threshold);
    recognizer.recognize(&prepared, request)
}
