use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use tracing::{debug, info};

/// Returns the per-user directory where a bundled tesseract may live.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bingo-autoplay")
        .join("tesseract")
}

fn executable_name() -> &'static str {
    if cfg!(windows) { "tesseract.exe" } else { "tesseract" }
}

const COMMON_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

fn runs(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Finds the tesseract executable.
///
/// Checks the configured path first, then the per-user directory, then
/// `PATH`, then the usual install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() || runs(path) {
            info!("Using configured tesseract: {}", path.display());
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!("Configured tesseract not found: {}", path.display()));
    }

    let local_exe = get_tesseract_dir().join(executable_name());
    if local_exe.exists() {
        info!("Tesseract found at: {}", local_exe.display());
        return Ok(local_exe);
    }

    let on_path = PathBuf::from("tesseract");
    if runs(&on_path) {
        debug!("Using tesseract from PATH");
        return Ok(on_path);
    }

    for path in COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            info!("Tesseract found at: {}", path);
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install tesseract-ocr and add it to PATH, \
         set ocr.tesseract_path in config.json, or copy it to: {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory holding `eng.traineddata`, if one is not
/// already known to the tesseract installation.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let local_tessdata = get_tesseract_dir().join("tessdata");
    if local_tessdata.join("eng.traineddata").exists() {
        return Some(local_tessdata);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    // Let tesseract use its compiled-in default
    None
}
