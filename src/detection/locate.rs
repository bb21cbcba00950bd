//! Finds which calibration entry fits an image by reading its header date.

use chrono::NaiveDate;
use image::RgbaImage;

use crate::config::OcrConfig;
use crate::error::ExtractionError;
use crate::geometry::{GeometrySpec, Offset};
use crate::ocr::{parse_numeric_date, recognize_region, OcrRequest, PageSegmentation, TextRecognizer};

/// A date read from an anchor box, with the calibration it selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedDate {
    pub date: NaiveDate,
    /// Position of the matching entry in the calibration registry
    pub entry_index: usize,
    pub offset: Offset,
}

pub struct DateLocator<'a, R: ?Sized> {
    geometry: &'a GeometrySpec,
    recognizer: &'a R,
    ocr: &'a OcrConfig,
}

impl<'a, R: TextRecognizer + ?Sized> DateLocator<'a, R> {
    pub fn new(geometry: &'a GeometrySpec, recognizer: &'a R, ocr: &'a OcrConfig) -> Self {
        Self {
            geometry,
            recognizer,
            ocr,
        }
    }

    /// Tries calibration entries in registration order and returns the first
    /// whose anchor box holds a `dd.mm.yyyy` date.
    ///
    /// `Ok(None)` means no entry matched, which is the normal outcome for
    /// images that are not schedule grids. OCR engine failures are errors.
    pub fn locate(&self, img: &RgbaImage) -> Result<Option<LocatedDate>, ExtractionError> {
        let request = OcrRequest {
            language: &self.ocr.date_language,
            segmentation: PageSegmentation::SingleLine,
        };

        for (entry_index, entry) in self.geometry.calibrations.iter().enumerate() {
            let text = recognize_region(
                self.recognizer,
                img,
                &entry.anchor,
                &request,
                self.ocr.binarize_threshold,
            )?;

            let Some(text) = text else {
                crate::log(&format!(
                    "Calibration '{}': anchor box outside {}x{} image",
                    entry.name,
                    img.width(),
                    img.height()
                ));
                continue;
            };

            match parse_numeric_date(&text) {
                Some(date) => {
                    crate::log(&format!(
                        "Calibration '{}' matched, date {}",
                        entry.name, date
                    ));
                    return Ok(Some(LocatedDate {
                        date,
                        entry_index,
                        offset: entry.offset,
                    }));
                }
                None => {
                    let text = text.trim();
                    if !text.is_empty() {
                        crate::log(&format!(
                            "Calibration '{}': '{}' is not a date",
                            entry.name, text
                        ));
                    }
                }
            }
        }

        Ok(None)
    }
}
