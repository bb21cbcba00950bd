//! Recognises "no scheduled outages" announcement pages.

use chrono::NaiveDate;
use image::RgbaImage;

use crate::config::OcrConfig;
use crate::error::ExtractionError;
use crate::geometry::GeometrySpec;
use crate::ocr::{
    contains_marker, parse_prose_date, recognize_page, recognize_region, OcrRequest,
    PageSegmentation, TextRecognizer,
};

pub struct NoOutageDetector<'a, R: ?Sized> {
    geometry: &'a GeometrySpec,
    recognizer: &'a R,
    ocr: &'a OcrConfig,
    marker: &'a str,
}

impl<'a, R: TextRecognizer + ?Sized> NoOutageDetector<'a, R> {
    pub fn new(
        geometry: &'a GeometrySpec,
        recognizer: &'a R,
        ocr: &'a OcrConfig,
        marker: &'a str,
    ) -> Self {
        Self {
            geometry,
            recognizer,
            ocr,
            marker,
        }
    }

    /// Returns the announced date if the page carries the marker phrase.
    ///
    /// The page is read in full first; the date box is only read once the
    /// marker is found, and its prose date is resolved against `today`.
    pub fn detect(
        &self,
        img: &RgbaImage,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>, ExtractionError> {
        let page_request = OcrRequest {
            language: &self.ocr.page_language,
            segmentation: PageSegmentation::Auto,
        };
        let page_text = recognize_page(
            self.recognizer,
            img,
            &page_request,
            self.ocr.binarize_threshold,
        )?;

        if !contains_marker(&page_text, self.marker) {
            return Ok(None);
        }
        crate::log("No-outage marker found, reading announcement date");

        let date_request = OcrRequest {
            language: &self.ocr.page_language,
            segmentation: PageSegmentation::SingleBlock,
        };
        let Some(date_text) = recognize_region(
            self.recognizer,
            img,
            &self.geometry.no_outage_date_box,
            &date_request,
            self.ocr.binarize_threshold,
        )?
        else {
            crate::log("No-outage date box is outside the image");
            return Ok(None);
        };

        let date = parse_prose_date(&date_text, today);
        if date.is_none() {
            crate::log(&format!(
                "No-outage announcement without a readable date: '{}'",
                date_text.trim()
            ));
        }
        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::{page_with_anchors, FnOcr, DATE_BOX_SIZE, PAGE_SIZE};

    const MARKER: &str = "відключень не застосовуватимуться";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
    }

    #[test]
    fn test_detects_announcement() {
        let geometry = GeometrySpec::default();
        let ocr = OcrConfig::default();
        let img = page_with_anchors(&[]);
        let recognizer = FnOcr::new(|img, request| {
            assert_eq!(request.language, "ukr");
            match img.dimensions() {
                PAGE_SIZE => "Шановні споживачі!\n16 жовтня графіки погодинних\nвідключень не застосовуватимуться".to_string(),
                DATE_BOX_SIZE => "на 16 жовтня".to_string(),
                _ => String::new(),
            }
        });

        let date = NoOutageDetector::new(&geometry, &recognizer, &ocr, MARKER)
            .detect(&img, today())
            .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 10, 16));
    }

    #[test]
    fn test_date_without_marker_is_ignored() {
        let geometry = GeometrySpec::default();
        let ocr = OcrConfig::default();
        let img = page_with_anchors(&[]);
        let recognizer = FnOcr::new(|img, _| match img.dimensions() {
            PAGE_SIZE => "Графік погодинних відключень на 16 жовтня".to_string(),
            DATE_BOX_SIZE => "на 16 жовтня".to_string(),
            _ => String::new(),
        });

        let date = NoOutageDetector::new(&geometry, &recognizer, &ocr, MARKER)
            .detect(&img, today())
            .unwrap();
        assert!(date.is_none());
    }

    #[test]
    fn test_marker_without_date() {
        let geometry = GeometrySpec::default();
        let ocr = OcrConfig::default();
        let img = page_with_anchors(&[]);
        let recognizer = FnOcr::new(|img, _| match img.dimensions() {
            PAGE_SIZE => MARKER.to_string(),
            _ => "незабаром".to_string(),
        });

        let date = NoOutageDetector::new(&geometry, &recognizer, &ocr, MARKER)
            .detect(&img, today())
            .unwrap();
        assert!(date.is_none());
    }
}
