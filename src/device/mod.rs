//! The tablet being played on: screenshots in, taps out.

pub mod archive;
pub mod recorder;
pub mod wda;

pub use archive::FrameArchive;
pub use recorder::ScreenRecorder;
pub use wda::WdaClient;

use image::DynamicImage;

use crate::error::Result;
use crate::layout::TapPoint;

pub trait Device {
    /// Captures the screen as PNG bytes.
    fn screenshot_png(&mut self) -> Result<Vec<u8>>;

    /// Taps a point; `label` names the target in the log.
    fn tap(&mut self, point: TapPoint, label: &str) -> Result<()>;
}

/// Captures a screenshot and decodes it, keeping the raw bytes for archiving.
pub fn capture(device: &mut dyn Device) -> Result<(Vec<u8>, DynamicImage)> {
    let png = device.screenshot_png()?;
    let image = image::load_from_memory(&png)?;
    Ok((png, image))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Serves queued screenshots and records every tap.
    #[derive(Default)]
    pub struct FakeDevice {
        pub screens: VecDeque<Vec<u8>>,
        pub taps: Vec<(TapPoint, String)>,
    }

    impl FakeDevice {
        pub fn push_screen(&mut self, image: &DynamicImage) {
            let mut png = Vec::new();
            image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png).unwrap();
            self.screens.push_back(png);
        }

        pub fn tap_labels(&self) -> Vec<&str> {
            self.taps.iter().map(|(_, label)| label.as_str()).collect()
        }
    }

    impl Device for FakeDevice {
        fn screenshot_png(&mut self) -> Result<Vec<u8>> {
            self.screens
                .pop_front()
                .ok_or_else(|| crate::error::BotError::Device("no screenshot queued".into()))
        }

        fn tap(&mut self, point: TapPoint, label: &str) -> Result<()> {
            self.taps.push((point, label.to_string()));
            Ok(())
        }
    }
}
