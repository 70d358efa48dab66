use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use image::GrayImage;
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::debug;

use super::DigitRecognizer;
use crate::error::{BotError, Result};

/// Bingo labels are one or two digits.
const LABEL_PATTERN: &str = r"^\d{1,2}$";

/// Interval between checks on a running tesseract process.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Keeps OCR output only when it reads as a bingo label.
pub fn clean_label(label: &Regex, raw: &str) -> String {
    let text = raw.trim();
    if label.is_match(text) {
        text.to_string()
    } else {
        if !text.is_empty() {
            debug!(raw = text, "discarding OCR output that is not a label");
        }
        String::new()
    }
}

/// Digit recognizer backed by the tesseract command line tool.
///
/// Each call writes the image to a temporary PNG and runs tesseract in
/// single-word mode with a digit whitelist. A call that outlives the
/// deadline is killed and reported as [`BotError::OcrTimeout`].
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    timeout: Duration,
    label: Regex,
}

impl TesseractRecognizer {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>, timeout: Duration) -> Result<Self> {
        let label = Regex::new(LABEL_PATTERN).map_err(|e| BotError::Ocr(e.to_string()))?;
        Ok(Self { executable, tessdata, timeout, label })
    }

    fn command(&self, input: &std::path::Path) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg(input).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("8") // Treat the image as a single word
            .arg("--oem")
            .arg("1")
            .arg("-c")
            .arg("tessedit_char_whitelist=0123456789")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl DigitRecognizer for TesseractRecognizer {
    fn recognize_digits(&self, img: &GrayImage) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let mut child = self.command(temp_input.path()).spawn().map_err(|e| {
            BotError::Ocr(format!("failed to run {}: {}", self.executable.display(), e))
        })?;

        let deadline = Instant::now() + self.timeout;
        while child.try_wait()?.is_none() {
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BotError::OcrTimeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::Ocr(format!("tesseract failed: {}", stderr.trim())));
        }

        Ok(clean_label(&self.label, &String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> Regex {
        Regex::new(LABEL_PATTERN).unwrap()
    }

    #[test]
    fn test_clean_label_accepts_bingo_numbers() {
        assert_eq!(clean_label(&label(), "7\n"), "7");
        assert_eq!(clean_label(&label(), " 64 \n\x0c"), "64");
    }

    #[test]
    fn test_clean_label_rejects_noise() {
        assert_eq!(clean_label(&label(), ""), "");
        assert_eq!(clean_label(&label(), "\n"), "");
        assert_eq!(clean_label(&label(), "1 1"), "");
        assert_eq!(clean_label(&label(), "111"), "");
    }

    #[test]
    fn test_missing_executable_is_an_ocr_error() {
        let recognizer = TesseractRecognizer::new(
            PathBuf::from("/nonexistent/tesseract-binary"),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let img = GrayImage::new(4, 4);

        match recognizer.recognize_digits(&img) {
            Err(BotError::Ocr(msg)) => assert!(msg.contains("failed to run")),
            other => panic!("expected OCR error, got {:?}", other),
        }
    }
}
