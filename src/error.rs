//! Error types for the extraction pipeline.
//!
//! `ExtractionError` keeps the failure kinds apart so callers can tell a
//! broken calibration from an undecodable upload. `ScheduleExtractor::extract`
//! folds all of them into `Extraction::NotASchedule` after logging.

/// Failure of the external OCR engine.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Tesseract failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write OCR input image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),

    /// A probe point fell outside the image after a date match. Means the
    /// calibration entry does not fit this template.
    #[error(
        "probe for group {group} hour {hour} at ({x}, {y}) is outside the {width}x{height} image"
    )]
    GeometryOutOfBounds {
        group: String,
        hour: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl ExtractionError {
    /// True for errors that indicate a calibration defect rather than a bad input.
    pub fn is_calibration_defect(&self) -> bool {
        matches!(self, ExtractionError::GeometryOutOfBounds { .. })
    }
}

/// An on/off interval whose hours do not describe a non-empty span of the day.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval {start_hour}..{end_hour}: hours must satisfy 0 <= start < end <= 24")]
pub struct IntervalError {
    pub start_hour: u8,
    pub end_hour: u8,
}
