//! Schedule extraction pipeline.
//!
//! This module provides:
//! - Date location over the calibration registry
//! - Grid sampling at the matched offset
//! - Interval compression per group
//! - The "no outages" announcement fallback
//!
//! `ScheduleExtractor` composes them into one stateless decision per image.

pub mod intervals;
pub mod locate;
pub mod no_outage;
pub mod sampler;

pub use intervals::{compress, expand, partitions_day, OnOffInterval, PowerState};
pub use locate::{DateLocator, LocatedDate};
pub use no_outage::NoOutageDetector;
pub use sampler::{GridSampler, RawStatusVector};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use crate::geometry::HOURS_PER_DAY;
use crate::ocr::TextRecognizer;

/// Intervals for every group on one date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSchedule {
    pub date: NaiveDate,
    pub groups: BTreeMap<String, Vec<OnOffInterval>>,
}

impl ExtractedSchedule {
    /// Compresses each group's samples independently.
    pub fn from_status(date: NaiveDate, status: &RawStatusVector) -> Self {
        let groups = status
            .iter()
            .map(|(label, states)| (label.to_string(), compress(states)))
            .collect();
        Self { date, groups }
    }

    /// A schedule in which every group has power all day.
    pub fn all_on<S: AsRef<str>>(date: NaiveDate, groups: &[S]) -> Self {
        let whole_day = compress(&[true; HOURS_PER_DAY]);
        let groups = groups
            .iter()
            .map(|label| (label.as_ref().to_string(), whole_day.clone()))
            .collect();
        Self { date, groups }
    }

    pub fn intervals(&self, group: &str) -> Option<&[OnOffInterval]> {
        self.groups.get(group).map(|v| v.as_slice())
    }
}

/// A page announcing that no scheduled outages apply on `date`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoOutagesAnnouncement {
    pub date: NaiveDate,
}

impl NoOutagesAnnouncement {
    /// The equivalent schedule: every group on for the whole day.
    pub fn to_schedule<S: AsRef<str>>(&self, groups: &[S]) -> ExtractedSchedule {
        ExtractedSchedule::all_on(self.date, groups)
    }
}

/// Result of processing one image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Extraction {
    Schedule(ExtractedSchedule),
    NoOutages(NoOutagesAnnouncement),
    /// Unrelated image; callers discard it silently.
    NotASchedule,
}

impl Extraction {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Extraction::Schedule(schedule) => Some(schedule.date),
            Extraction::NoOutages(announcement) => Some(announcement.date),
            Extraction::NotASchedule => None,
        }
    }

    /// Schedule view of the outcome, synthesizing one for announcements.
    pub fn to_schedule<S: AsRef<str>>(&self, groups: &[S]) -> Option<ExtractedSchedule> {
        match self {
            Extraction::Schedule(schedule) => Some(schedule.clone()),
            Extraction::NoOutages(announcement) => Some(announcement.to_schedule(groups)),
            Extraction::NotASchedule => None,
        }
    }
}

/// Stateless image → schedule pipeline.
///
/// Holds only read-only configuration and the OCR engine handle, so a single
/// instance can serve many threads at once.
pub struct ScheduleExtractor<R> {
    config: ExtractorConfig,
    recognizer: R,
}

impl<R: TextRecognizer> ScheduleExtractor<R> {
    /// Fails when the geometry is unusable, so a bad table is caught before
    /// the first image instead of inside the feed handler.
    pub fn new(config: ExtractorConfig, recognizer: R) -> anyhow::Result<Self> {
        config
            .geometry
            .validate()
            .context("Invalid extractor geometry")?;
        Ok(Self { config, recognizer })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn date_locator(&self) -> DateLocator<'_, R> {
        DateLocator::new(&self.config.geometry, &self.recognizer, &self.config.ocr)
    }

    pub fn grid_sampler(&self) -> GridSampler<'_> {
        GridSampler::new(&self.config.geometry, self.config.red_threshold)
    }

    pub fn no_outage_detector(&self) -> NoOutageDetector<'_, R> {
        NoOutageDetector::new(
            &self.config.geometry,
            &self.recognizer,
            &self.config.ocr,
            &self.config.no_outage_marker,
        )
    }

    /// Processes one image, absorbing every failure into `NotASchedule`.
    pub fn extract(&self, image_bytes: &[u8]) -> Extraction {
        self.extract_on(image_bytes, Local::now().date_naive())
    }

    /// Like [`extract`](Self::extract) with an explicit reference date for
    /// year-less announcement dates.
    pub fn extract_on(&self, image_bytes: &[u8], today: NaiveDate) -> Extraction {
        match self.try_extract(image_bytes, today) {
            Ok(extraction) => extraction,
            Err(e) if e.is_calibration_defect() => {
                crate::log(&format!(
                    "CALIBRATION ERROR: {}. Image skipped; the calibration table needs an entry for this template.",
                    e
                ));
                Extraction::NotASchedule
            }
            Err(e) => {
                crate::log(&format!("Skipping image: {}", e));
                Extraction::NotASchedule
            }
        }
    }

    /// Decodes and processes one image, keeping failure kinds distinct.
    pub fn try_extract(
        &self,
        image_bytes: &[u8],
        today: NaiveDate,
    ) -> Result<Extraction, ExtractionError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(ExtractionError::Decode)?
            .to_rgba8();
        self.try_extract_image(&img, today)
    }

    /// The decision procedure on an already decoded image.
    pub fn try_extract_image(
        &self,
        img: &RgbaImage,
        today: NaiveDate,
    ) -> Result<Extraction, ExtractionError> {
        if let Some(located) = self.date_locator().locate(img)? {
            let status = self.grid_sampler().sample(img, located.offset)?;
            return Ok(Extraction::Schedule(ExtractedSchedule::from_status(
                located.date,
                &status,
            )));
        }

        if let Some(date) = self.no_outage_detector().detect(img, today)? {
            crate::log(&format!("No outages announced for {}", date));
            return Ok(Extraction::NoOutages(NoOutagesAnnouncement { date }));
        }

        Ok(Extraction::NotASchedule)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Synthetic pages and a scriptable recognizer for pipeline tests.

    use image::{GrayImage, Rgba, RgbaImage};

    use crate::error::OcrError;
    use crate::geometry::{CoordinateMap, GeometrySpec};
    use crate::ocr::{OcrRequest, TextRecognizer};

    pub const PAGE_SIZE: (u32, u32) = (1100, 1200);
    pub const DATE_BOX_SIZE: (u32, u32) = (960, 80);
    pub const POWERED: Rgba<u8> = Rgba([60, 180, 75, 255]);
    pub const OUTAGE: Rgba<u8> = Rgba([230, 40, 40, 255]);

    /// Gray shade painted into each calibration entry's anchor box.
    const ANCHOR_SHADES: [u8; 2] = [10, 90];

    type RecognizeFn = dyn Fn(&GrayImage, &OcrRequest<'_>) -> Result<String, OcrError> + Send + Sync;

    pub struct FnOcr {
        f: Box<RecognizeFn>,
    }

    impl FnOcr {
        pub fn new<F>(f: F) -> Self
        where
            F: Fn(&GrayImage, &OcrRequest<'_>) -> String + Send + Sync + 'static,
        {
            Self {
                f: Box::new(move |img: &GrayImage, request: &OcrRequest<'_>| Ok(f(img, request))),
            }
        }

        pub fn failing<F>(make_error: F) -> Self
        where
            F: Fn() -> OcrError + Send + Sync + 'static,
        {
            Self {
                f: Box::new(move |_: &GrayImage, _: &OcrRequest<'_>| Err(make_error())),
            }
        }
    }

    impl TextRecognizer for FnOcr {
        fn recognize(&self, img: &GrayImage, request: &OcrRequest<'_>) -> Result<String, OcrError> {
            (self.f)(img, request)
        }
    }

    /// White page with the anchor boxes of the given calibration entries shaded.
    pub fn page_with_anchors(entries: &[usize]) -> RgbaImage {
        let geometry = GeometrySpec::default();
        let mut img = RgbaImage::from_pixel(PAGE_SIZE.0, PAGE_SIZE.1, Rgba([255, 255, 255, 255]));
        for &idx in entries {
            let anchor = geometry.calibrations[idx].anchor;
            let shade = ANCHOR_SHADES[idx];
            for y in anchor.top..anchor.bottom {
                for x in anchor.left..anchor.right {
                    img.put_pixel(x, y, Rgba([shade, shade, shade, 255]));
                }
            }
        }
        img
    }

    /// Which calibration entry's anchor box a crop shows, judged by its shade.
    pub fn anchor_marker(img: &GrayImage) -> Option<usize> {
        if img.dimensions() != (157, 37) {
            return None;
        }
        match img.get_pixel(0, 0)[0] {
            0..50 => Some(0),
            50..150 => Some(1),
            _ => None,
        }
    }

    /// Paints every probe of `group` for the hours where `powered` is true,
    /// and the rest with the outage colour.
    pub fn paint_group(img: &mut RgbaImage, entry: usize, group: usize, powered: &[bool]) {
        let geometry = GeometrySpec::default();
        let map = CoordinateMap::build(&geometry, geometry.calibrations[entry].offset);
        for (hour, &on) in powered.iter().enumerate() {
            let point = map.point(hour, group);
            img.put_pixel(point.x, point.y, if on { POWERED } else { OUTAGE });
        }
    }

    pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::OcrError;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
    }

    fn date_ocr() -> FnOcr {
        FnOcr::new(|img, _| match anchor_marker(img) {
            Some(_) => "16.10.2024".to_string(),
            None => String::new(),
        })
    }

    #[test]
    fn test_end_to_end_schedule() {
        let mut img = page_with_anchors(&[0]);
        paint_group(&mut img, 0, 0, &[true; 24]);
        for group in 1..6 {
            paint_group(&mut img, 0, group, &[false; 24]);
        }

        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), date_ocr()).unwrap();
        let result = extractor.try_extract(&encode_png(&img), today()).unwrap();

        let Extraction::Schedule(schedule) = result else {
            panic!("expected a schedule, got {:?}", result);
        };
        assert_eq!(schedule.date, NaiveDate::from_ymd_opt(2024, 10, 16).unwrap());
        assert_eq!(schedule.groups.len(), 6);
        assert_eq!(
            schedule.intervals("1.1").unwrap(),
            &[OnOffInterval::new(PowerState::On, 0, 24).unwrap()]
        );
        for group in ["1.2", "2.1", "2.2", "3.1", "3.2"] {
            assert_eq!(
                schedule.intervals(group).unwrap(),
                &[OnOffInterval::new(PowerState::Off, 0, 24).unwrap()],
                "group {}",
                group
            );
        }
    }

    #[test]
    fn test_matched_entry_offset_is_used() {
        // Grid drawn at the second template's offset; first anchor is blank.
        let mut img = page_with_anchors(&[1]);
        let mut states = vec![true; 24];
        states[18..22].iter_mut().for_each(|s| *s = false);
        for group in 0..6 {
            paint_group(&mut img, 1, group, &states);
        }

        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), date_ocr()).unwrap();
        let result = extractor.try_extract_image(&img, today()).unwrap();

        let schedule = result.to_schedule(&ExtractorConfig::default().geometry.groups).unwrap();
        assert_eq!(
            schedule.intervals("3.2").unwrap(),
            &[
                OnOffInterval::new(PowerState::On, 0, 18).unwrap(),
                OnOffInterval::new(PowerState::Off, 18, 22).unwrap(),
                OnOffInterval::new(PowerState::On, 22, 24).unwrap(),
            ]
        );
    }

    #[test]
    fn test_no_outages_announcement() {
        let img = page_with_anchors(&[]);
        let recognizer = FnOcr::new(|img, _| match img.dimensions() {
            PAGE_SIZE => "Графіки погодинних відключень не застосовуватимуться".to_string(),
            DATE_BOX_SIZE => "17 жовтня".to_string(),
            _ => String::new(),
        });

        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), recognizer).unwrap();
        let result = extractor.extract_on(&encode_png(&img), today());

        let expected_date = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();
        assert_eq!(
            result,
            Extraction::NoOutages(NoOutagesAnnouncement {
                date: expected_date
            })
        );

        let schedule = result.to_schedule(&["1.1", "3.2"]).unwrap();
        assert_eq!(schedule.date, expected_date);
        assert_eq!(
            schedule.intervals("3.2").unwrap(),
            &[OnOffInterval::new(PowerState::On, 0, 24).unwrap()]
        );
    }

    #[test]
    fn test_unrelated_image_is_not_a_schedule() {
        let img = page_with_anchors(&[]);
        let recognizer = FnOcr::new(|img, _| match img.dimensions() {
            PAGE_SIZE => "Оголошення від 16.10.2024: ремонт лінії".to_string(),
            DATE_BOX_SIZE => "16.10.2024".to_string(),
            _ => String::new(),
        });

        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), recognizer).unwrap();
        assert_eq!(extractor.extract_on(&encode_png(&img), today()), Extraction::NotASchedule);
    }

    #[test]
    fn test_geometry_mismatch_is_distinct_error() {
        // Anchor present, but the page is too small for the grid.
        let geometry = ExtractorConfig::default().geometry;
        let anchor = geometry.calibrations[0].anchor;
        let mut img = RgbaImage::from_pixel(600, 400, image::Rgba([255, 255, 255, 255]));
        for y in anchor.top..anchor.bottom {
            for x in anchor.left..anchor.right {
                img.put_pixel(x, y, image::Rgba([10, 10, 10, 255]));
            }
        }

        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), date_ocr()).unwrap();
        let err = extractor.try_extract_image(&img, today()).unwrap_err();
        assert!(err.is_calibration_defect());

        assert_eq!(extractor.extract_on(&encode_png(&img), today()), Extraction::NotASchedule);
    }

    #[test]
    fn test_new_rejects_invalid_geometry() {
        let mut config = ExtractorConfig::default();
        config.geometry.split_index = 0;
        assert!(ScheduleExtractor::new(config, date_ocr()).is_err());

        let mut config = ExtractorConfig::default();
        config.geometry.calibrations[0].offset.y = u32::MAX - 1;
        assert!(ScheduleExtractor::new(config, date_ocr()).is_err());
    }

    #[test]
    fn test_saturated_probe_is_out_of_bounds() {
        let geometry = ExtractorConfig::default().geometry;
        let img = RgbaImage::new(1100, 1200);
        let err = GridSampler::new(&geometry, 200)
            .sample(&img, crate::geometry::Offset { x: u32::MAX - 5, y: 0 })
            .unwrap_err();
        assert!(err.is_calibration_defect());
    }

    #[test]
    fn test_decode_failure_is_absorbed() {
        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), date_ocr()).unwrap();
        let err = extractor.try_extract(b"not an image", today()).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
        assert_eq!(extractor.extract(b"not an image"), Extraction::NotASchedule);
    }

    #[test]
    fn test_ocr_failure_is_absorbed() {
        let img = page_with_anchors(&[0]);
        let recognizer = FnOcr::failing(|| OcrError::Unavailable("no tesseract".to_string()));
        let extractor = ScheduleExtractor::new(ExtractorConfig::default(), recognizer).unwrap();

        assert!(matches!(
            extractor.try_extract_image(&img, today()),
            Err(ExtractionError::Ocr(OcrError::Unavailable(_)))
        ));
        assert_eq!(extractor.extract_on(&encode_png(&img), today()), Extraction::NotASchedule);
    }

    #[test]
    fn test_extraction_json_is_tagged() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let json = serde_json::to_value(Extraction::NoOutages(NoOutagesAnnouncement { date })).unwrap();
        assert_eq!(json["outcome"], "no_outages");
        assert_eq!(json["date"], "2024-10-16");

        let json = serde_json::to_value(Extraction::NotASchedule).unwrap();
        assert_eq!(json["outcome"], "not_a_schedule");

        let schedule = Extraction::Schedule(ExtractedSchedule::all_on(date, &["1.1"]));
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["outcome"], "schedule");
        assert_eq!(json["groups"]["1.1"][0]["state"], "on");
        let back: Extraction = serde_json::from_value(json).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn test_extractor_is_shareable_across_threads() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<ScheduleExtractor<FnOcr>>();
        assert_sync::<ScheduleExtractor<crate::ocr::Tesseract>>();
    }
}
