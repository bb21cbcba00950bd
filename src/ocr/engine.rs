use image::GrayImage;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use crate::config::OcrConfig;
use crate::error::OcrError;

/// Tesseract page segmentation modes used by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSegmentation {
    /// Fully automatic layout analysis (full announcement pages)
    Auto,
    /// Assume a single uniform block of text
    SingleBlock,
    /// Treat the image as a single text line (anchor dates)
    SingleLine,
}

impl PageSegmentation {
    fn psm(self) -> &'static str {
        match self {
            PageSegmentation::Auto => "3",
            PageSegmentation::SingleBlock => "6",
            PageSegmentation::SingleLine => "7",
        }
    }
}

/// What to recognize: language and layout hint.
#[derive(Clone, Copy, Debug)]
pub struct OcrRequest<'a> {
    pub language: &'a str,
    pub segmentation: PageSegmentation,
}

/// Something that turns a grayscale image into text.
///
/// The pipeline only depends on this trait so tests can substitute a fake.
pub trait TextRecognizer {
    fn recognize(&self, img: &GrayImage, request: &OcrRequest<'_>) -> Result<String, OcrError>;
}

/// Tesseract CLI invoked as a subprocess, one process per image.
#[derive(Clone, Debug)]
pub struct Tesseract {
    executable: PathBuf,
    tessdata_override: Option<PathBuf>,
    timeout: Duration,
}

impl Tesseract {
    pub fn new(executable: PathBuf, tessdata_override: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable,
            tessdata_override,
            timeout,
        }
    }

    /// Locates the executable according to the OCR settings.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let executable = find_tesseract_executable(config)?;
        Ok(Self::new(
            executable,
            config.tessdata_dir.clone(),
            Duration::from_millis(config.timeout_ms),
        ))
    }
}

impl TextRecognizer for Tesseract {
    /// Runs Tesseract on a preprocessed grayscale image and returns the raw text.
    fn recognize(&self, img: &GrayImage, request: &OcrRequest<'_>) -> Result<String, OcrError> {
        // Input, output and stderr live in one directory removed on drop,
        // whichever way the call ends
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("input.png");
        img.save(&input_path)?;

        // Tesseract appends .txt to the output base
        let output_base = workdir.path().join("output");
        let stderr_path = workdir.path().join("stderr.log");
        let stderr_file = File::create(&stderr_path)?;

        let mut command = Command::new(&self.executable);
        command.arg(&input_path).arg(&output_base);

        let tessdata = self
            .tessdata_override
            .clone()
            .or_else(|| find_tessdata_dir(request.language));
        if let Some(tessdata) = tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }

        command
            .arg("-l")
            .arg(request.language)
            .arg("--psm")
            .arg(request.segmentation.psm())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file));

        let mut child = command.spawn().map_err(|e| {
            OcrError::Unavailable(format!("{}: {}", self.executable.display(), e))
        })?;

        let status = wait_with_timeout(&mut child, self.timeout)?;

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(OcrError::Failed(format!("{} ({})", stderr.trim(), status)));
        }

        let text = fs::read_to_string(output_base.with_extension("txt"))?;
        Ok(text)
    }
}

/// Polls the child until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, OcrError> {
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(OcrError::Timeout {
                after_ms: timeout.as_millis() as u64,
            });
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}
