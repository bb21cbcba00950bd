//! CSV history of extracted schedules.
//!
//! Appends one row per interval in append-only mode, so a crash mid-batch
//! keeps everything written so far.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::detection::ExtractedSchedule;

/// CSV header row.
const CSV_HEADER: &str = "date,group,state,start_hour,end_hour,source";

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Appends every interval of a schedule, tagged with where the image came from.
pub fn append_schedule(path: &Path, schedule: &ExtractedSchedule, source: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    let date = schedule.date.format("%Y-%m-%d");
    let source = source.replace(',', "_");

    for (group, intervals) in &schedule.groups {
        for interval in intervals {
            writeln!(
                file,
                "{},{},{},{},{},{}",
                date,
                group,
                interval.state(),
                interval.start_hour(),
                interval.end_hour(),
                source
            )
            .context("Failed to write CSV row")?;
        }
    }

    Ok(())
}
