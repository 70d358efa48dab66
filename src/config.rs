//! Bot configuration.
//!
//! Loaded from `config.json` at startup. Every field has a default, so a
//! partial file only overrides what it names; a missing or malformed file
//! falls back to the defaults with a logged reason.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::layout::VariantTiming;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Host of the tablet running WebDriverAgent, e.g. `http://192.168.1.20`
    pub base_url: String,
    pub wda_port: u16,
    pub mjpeg_port: u16,
    pub request_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            wda_port: 8100,
            mjpeg_port: 9100,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: Option<PathBuf>,
    pub tessdata_dir: Option<PathBuf>,
    /// A recognition call running longer than this counts as "no signal"
    pub timeout_ms: u64,
    /// Worker pool size; rayon picks one per core when unset
    pub worker_threads: Option<usize>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            timeout_ms: 3000,
            worker_threads: None,
        }
    }
}

/// Delay overrides. Unset per-variant delays keep the variant's own values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub pick_settle_ms: Option<u64>,
    pub after_pick_tap_ms: Option<u64>,
    pub jump_settle_ms: Option<u64>,
    pub after_multiplier_ms: Option<u64>,
    /// Wait after game over so the final screen makes it into the video
    pub final_recording_delay_ms: u64,
    /// Pause between frames
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pick_settle_ms: None,
            after_pick_tap_ms: None,
            jump_settle_ms: None,
            after_multiplier_ms: None,
            final_recording_delay_ms: 10_000,
            poll_interval_ms: 0,
        }
    }
}

impl TimingConfig {
    /// Applies the configured overrides on top of a variant's delays.
    pub fn apply(&self, timing: &mut VariantTiming) {
        let set = |slot: &mut Duration, ms: Option<u64>| {
            if let Some(ms) = ms {
                *slot = Duration::from_millis(ms);
            }
        };
        set(&mut timing.pick_settle, self.pick_settle_ms);
        set(&mut timing.after_pick_tap, self.after_pick_tap_ms);
        set(&mut timing.jump_settle, self.jump_settle_ms);
        set(&mut timing.after_multiplier, self.after_multiplier_ms);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub device: DeviceConfig,
    pub record_video: bool,
    pub archive_screenshots: bool,
    pub ocr: OcrConfig,
    pub timing: TimingConfig,
    /// Board recognition attempts before a game is abandoned
    pub max_board_attempts: u32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            record_video: true,
            archive_screenshots: true,
            ocr: OcrConfig::default(),
            timing: TimingConfig::default(),
            max_board_attempts: 5,
        }
    }
}

/// Loads configuration from `path`, or returns defaults.
pub fn load_config(path: &Path) -> BotConfig {
    info!("Looking for config at: {}", path.display());

    if !path.exists() {
        info!("{} not found. Using default config.", path.display());
        return BotConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                return config;
            }
            Err(e) => warn!("Failed to parse {}: {}. Using defaults.", path.display(), e),
        },
        Err(e) => warn!("Failed to read {}: {}. Using defaults.", path.display(), e),
    }

    BotConfig::default()
}

/// Parses a config file body; absent fields keep their defaults.
pub fn parse_config(contents: &str) -> serde_json::Result<BotConfig> {
    serde_json::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VariantLayout;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();

        assert_eq!(config.device.wda_port, 8100);
        assert_eq!(config.device.mjpeg_port, 9100);
        assert!(config.record_video);
        assert!(config.archive_screenshots);
        assert_eq!(config.ocr.timeout_ms, 3000);
        assert_eq!(config.timing.final_recording_delay_ms, 10_000);
        assert_eq!(config.max_board_attempts, 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"{ "device": { "base_url": "http://10.0.0.7" }, "ocr": { "worker_threads": 6 } }"#,
        )
        .unwrap();

        assert_eq!(config.device.base_url, "http://10.0.0.7");
        assert_eq!(config.device.wda_port, 8100);
        assert_eq!(config.ocr.worker_threads, Some(6));
        assert_eq!(config.ocr.timeout_ms, 3000);
        assert!(config.record_video);
        assert_eq!(config.max_board_attempts, 5);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = BotConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = parse_config(&json).unwrap();

        assert_eq!(parsed.device.base_url, config.device.base_url);
        assert_eq!(parsed.max_board_attempts, config.max_board_attempts);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config.max_board_attempts, 5);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config(&path);
        assert!(config.record_video);
    }

    #[test]
    fn test_timing_overrides() {
        let mut layout = VariantLayout::king();
        let timing = TimingConfig { pick_settle_ms: Some(750), ..TimingConfig::default() };

        timing.apply(&mut layout.timing);

        assert_eq!(layout.timing.pick_settle, Duration::from_millis(750));
        assert_eq!(layout.timing.after_pick_tap, Duration::from_millis(400));
    }
}
