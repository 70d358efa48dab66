pub mod engine;
pub mod setup;

pub use engine::TesseractRecognizer;
pub use setup::{find_tessdata_dir, find_tesseract_executable};

use image::GrayImage;
use tracing::warn;

use crate::error::{BotError, Result};

/// Digit-only OCR over a prepared image.
///
/// Returns the recognized label, or an empty string when nothing legible
/// was found. Implementations must be callable from worker threads.
pub trait DigitRecognizer: Send + Sync {
    fn recognize_digits(&self, img: &GrayImage) -> Result<String>;
}

/// Runs `recognizer`, treating a timeout as "no signal" for this frame.
pub fn recognize_or_empty(recognizer: &dyn DigitRecognizer, img: &GrayImage) -> Result<String> {
    match recognizer.recognize_digits(img) {
        Err(BotError::OcrTimeout(limit)) => {
            warn!(?limit, "OCR timed out, treating as empty");
            Ok(String::new())
        }
        other => other,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_timeout_is_empty() {
        let img = GrayImage::new(4, 4);
        assert_eq!(recognize_or_empty(&TimeoutRecognizer, &img).unwrap(), "");
    }

    #[test]
    fn test_other_results_pass_through() {
        let img = GrayImage::new(4, 4);
        assert_eq!(recognize_or_empty(&FixedRecognizer("42"), &img).unwrap(), "42");
    }
}
