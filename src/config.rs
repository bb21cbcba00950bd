//! Configuration types for extraction.
//!
//! Loads settings from config.json at startup. Provides the grid geometry and
//! calibration registry, the sampling threshold, the announcement marker
//! phrase, and OCR engine settings. The loaded value is passed explicitly to
//! the extractor.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::GeometrySpec;

/// OCR engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit path to the tesseract executable. Discovered when unset.
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory. Discovered per language when unset.
    pub tessdata_dir: Option<PathBuf>,
    /// Language used for the numeric anchor dates
    pub date_language: String,
    /// Language used for full-page announcement text and prose dates
    pub page_language: String,
    /// Upper bound for a single tesseract call (milliseconds)
    pub timeout_ms: u64,
    /// When set, crops are binarized (dark text below this luma becomes black) before OCR
    pub binarize_threshold: Option<u8>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            date_language: "eng".to_string(),
            page_language: "ukr".to_string(),
            timeout_ms: 30000,
            binarize_threshold: None,
        }
    }
}

/// Complete extraction configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Grid layout and calibration registry
    #[serde(default)]
    pub geometry: GeometrySpec,
    /// Probe pixels with a red channel below this are read as powered
    #[serde(default = "default_red_threshold")]
    pub red_threshold: u8,
    /// Phrase that marks a "no scheduled outages" announcement page
    #[serde(default = "default_no_outage_marker")]
    pub no_outage_marker: String,
    #[serde(default)]
    pub ocr: OcrConfig,
}

fn default_red_threshold() -> u8 {
    200
}

fn default_no_outage_marker() -> String {
    "відключень не застосовуватимуться".to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            geometry: GeometrySpec::default(),
            red_threshold: default_red_threshold(),
            no_outage_marker: default_no_outage_marker(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Parses and validates a config from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: ExtractorConfig =
            serde_json::from_str(contents).context("Failed to parse config JSON")?;
        config.geometry.validate()?;
        Ok(config)
    }

    /// Loads configuration from an explicit path, failing loudly if it is unusable.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        crate::log(&format!("Config loaded from {}", path.display()));
        Ok(config)
    }

    /// Loads configuration from `path` if given, otherwise from config.json
    /// next to the executable, falling back to defaults when that is missing
    /// or broken.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let config_path = crate::paths::get_default_config_path();
        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if !config_path.exists() {
            crate::log("config.json not found. Using default config.");
            return Ok(Self::default());
        }

        match Self::load_from(&config_path) {
            Ok(config) => Ok(config),
            Err(e) => {
                crate::log(&format!("{:#}. Using defaults.", e));
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_calibration() {
        let config = ExtractorConfig::default();
        assert_eq!(config.red_threshold, 200);
        assert_eq!(config.ocr.page_language, "ukr");
        assert!(config.ocr.binarize_threshold.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ExtractorConfig::from_json(r#"{"red_threshold": 180}"#).unwrap();
        assert_eq!(config.red_threshold, 180);
        assert_eq!(config.no_outage_marker, default_no_outage_marker());
        assert_eq!(config.geometry.calibrations.len(), 2);
        assert_eq!(config.ocr.timeout_ms, 30000);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let result = ExtractorConfig::from_json(r#"{"geometry": {"calibrations": []}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"no_outage_marker": "test marker"}"#).unwrap();

        let config = ExtractorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.no_outage_marker, "test marker");
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(ExtractorConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_bundled_config_parses() {
        let contents = include_str!("../config.json");
        let config = ExtractorConfig::from_json(contents).unwrap();
        let defaults = ExtractorConfig::default();
        assert_eq!(config.red_threshold, defaults.red_threshold);
        assert_eq!(config.geometry.calibrations, defaults.geometry.calibrations);
    }
}
