use image::GrayImage;

use crate::error::Result;
use crate::layout::{PickLayout, PickLayouts, TapPoint};
use crate::ocr::{recognize_or_empty, DigitRecognizer};
use crate::pool::WorkerPool;
use crate::vision::extract;

/// One candidate bubble offered by a pick boost.
#[derive(Clone, Debug, PartialEq)]
pub struct PickOption {
    pub label: String,
    pub tap: TapPoint,
}

/// OCRs every bubble of `layout`, in layout order.
pub fn read_pick_options(
    gray: &GrayImage,
    picks: &PickLayouts,
    layout: &PickLayout,
    ocr: &dyn DigitRecognizer,
    pool: &WorkerPool,
) -> Result<Vec<PickOption>> {
    pool.map(&layout.bubbles, |&(x, y)| {
        let prepared = extract(gray, &picks.region(x, y), &picks.normalize);
        Ok(PickOption { label: recognize_or_empty(ocr, &prepared)?, tap: picks.tap(x, y) })
    })
    .into_iter()
    .collect()
}

/// First of `ranked` offered by a bubble, with that bubble.
pub fn choose<'a>(ranked: &[&str], options: &'a [PickOption]) -> Option<&'a PickOption> {
    ranked
        .iter()
        .find_map(|number| options.iter().find(|o| o.label == *number))
}
