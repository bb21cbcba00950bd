//! Power-outage schedule extraction.
//!
//! Turns a published schedule image into per-group hourly on/off intervals,
//! tolerating layout drift between templates and recognising "no outages"
//! announcement pages.

pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod notify;
pub mod ocr;
pub mod paths;
pub mod preview;
pub mod worker;

pub use config::ExtractorConfig;
pub use detection::{
    ExtractedSchedule, Extraction, NoOutagesAnnouncement, OnOffInterval, PowerState,
    ScheduleExtractor,
};
pub use error::{ExtractionError, OcrError};
pub use geometry::{CalibrationEntry, GeometrySpec, Offset, PixelRect};

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

/// Logs a message to both stderr and log file with timestamp.
///
/// Stdout is left alone so JSON output stays machine-readable.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    eprint!("{}", line);
    let log_path = paths::get_logs_dir().join("poweroff_detector.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}
