use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::log;
use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub languages: Vec<String>,
}

/// Returns the local tessdata directory managed by this tool.
pub fn get_local_tessdata_dir() -> PathBuf {
    get_tesseract_dir().join("tessdata")
}

/// Ensures Tesseract and every configured language are usable.
///
/// The executable must be installed by the user. Missing traineddata files
/// are downloaded into the local tessdata directory.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config).map_err(|e| {
        anyhow!(
            "{}\nInstall Tesseract-OCR (e.g. `apt install tesseract-ocr` or the \
             UB-Mannheim installer on Windows), or set ocr.tesseract_path in config.json",
            e
        )
    })?;
    log(&format!("Tesseract found at: {}", executable.display()));

    let installed = list_installed_languages(&executable).unwrap_or_else(|e| {
        log(&format!("Could not list Tesseract languages: {}", e));
        Vec::new()
    });

    let mut languages = vec![config.date_language.clone()];
    if config.page_language != config.date_language {
        languages.push(config.page_language.clone());
    }

    for language in &languages {
        // An explicit tessdata_dir replaces every other search location
        let present = match &config.tessdata_dir {
            Some(dir) => traineddata_path(dir, language).exists(),
            None => installed.contains(language) || find_tessdata_dir(language).is_some(),
        };
        if present {
            continue;
        }

        let tessdata_dir = config
            .tessdata_dir
            .clone()
            .unwrap_or_else(get_local_tessdata_dir);
        fs::create_dir_all(&tessdata_dir)?;
        download_traineddata(language, &tessdata_dir)?;
    }

    log("Tesseract ready");

    Ok(TesseractPaths {
        executable,
        languages,
    })
}

fn traineddata_path(dir: &Path, language: &str) -> PathBuf {
    dir.join(format!("{}.traineddata", language))
}

/// Downloads `<language>.traineddata` from the tessdata repository
fn download_traineddata(language: &str, tessdata_dir: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let path = traineddata_path(tessdata_dir, language);

    log(&format!("Downloading {}.traineddata...", language));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "poweroff-detector")
        .send()
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    write_atomically(&path, &bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    ));

    Ok(())
}

/// Writes `bytes` to a temp file beside `path`, then renames it into place,
/// so an interrupted write never leaves a truncated file at `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .with_context(|| format!("Failed to move download into {}", path.display()))?;
    Ok(())
}

/// Finds the Tesseract executable: configured path, then our local dir, then PATH,
/// then common install locations.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf, OcrError> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(OcrError::Unavailable(format!(
            "configured tesseract_path {} does not exist",
            path.display()
        )));
    }

    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_EXECUTABLE_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(OcrError::Unavailable(
        "Tesseract not found. Please install Tesseract-OCR.".to_string(),
    ))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
///
/// Returns `None` when only Tesseract's built-in default location is left,
/// in which case no `--tessdata-dir` argument should be passed.
pub fn find_tessdata_dir(language: &str) -> Option<PathBuf> {
    let local_tessdata = get_local_tessdata_dir();
    if traineddata_path(&local_tessdata, language).exists() {
        return Some(local_tessdata);
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if traineddata_path(&p, language).exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if traineddata_path(&p, language).exists() {
            return Some(p);
        }
    }

    None
}

/// Asks the executable which languages its default tessdata directory provides.
pub fn list_installed_languages(executable: &Path) -> Result<Vec<String>> {
    let output = Command::new(executable)
        .arg("--list-langs")
        .output()
        .with_context(|| format!("Failed to run {}", executable.display()))?;

    if !output.status.success() {
        return Err(anyhow!(
            "tesseract --list-langs failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    // Some builds print the list to stderr
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(parse_language_list(&text))
}

/// Parses `--list-langs` output, skipping the "List of available languages" header.
fn parse_language_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(' '))
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\neng\nosd\nukr\n";
        assert_eq!(parse_language_list(output), vec!["eng", "osd", "ukr"]);
    }

    #[test]
    fn test_parse_language_list_empty() {
        assert!(parse_language_list("").is_empty());
    }

    #[test]
    fn test_write_atomically_leaves_only_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = traineddata_path(dir.path(), "ukr");

        write_atomically(&path, b"model bytes").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"model bytes");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomically_replaces_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = traineddata_path(dir.path(), "eng");
        fs::write(&path, b"trunc").unwrap();

        write_atomically(&path, b"complete model").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"complete model");
    }

    #[test]
    fn test_configured_missing_executable() {
        let config = OcrConfig {
            tesseract_path: Some(PathBuf::from("/nonexistent/tesseract")),
            ..OcrConfig::default()
        };
        assert!(matches!(
            find_tesseract_executable(&config),
            Err(OcrError::Unavailable(_))
        ));
    }
}
