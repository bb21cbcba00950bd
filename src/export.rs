//! JSON export for extraction results.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::detection::Extraction;

/// One processed image in an export file.
#[derive(Debug, Serialize)]
pub struct ExportRecord<'a> {
    pub source: &'a Path,
    #[serde(flatten)]
    pub extraction: &'a Extraction,
}

/// Export extraction results to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_to_json(results: &[(PathBuf, Extraction)], output_path: &Path) -> Result<()> {
    let records: Vec<ExportRecord<'_>> = results
        .iter()
        .map(|(source, extraction)| ExportRecord { source, extraction })
        .collect();

    let json = serde_json::to_string_pretty(&records)
        .context("Failed to serialize extraction results to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}
