use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("{variant}: picking from {candidates} candidate bubble(s) is not supported")]
    Unsupported {
        variant: &'static str,
        candidates: usize,
    },

    #[error("card recognition failed: {found} distinct numbers recognized, expected 24 ({detail})")]
    InvalidCard { found: usize, detail: String },

    #[error("OCR did not finish within {0:?}")]
    OcrTimeout(Duration),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("failed to load asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("device error: {0}")]
    Device(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
