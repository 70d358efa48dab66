use image::GrayImage;
use tracing::trace;

use crate::assets::Templates;
use crate::error::Result;
use crate::layout::{CalledBallLayout, TemplateProbe};
use crate::ocr::{recognize_or_empty, DigitRecognizer};
use crate::vision::{crop_gray, extract, gray_images_match};

fn template_matches(strip: &GrayImage, probe: &TemplateProbe, templates: &Templates) -> bool {
    let Some(template) = templates.get(probe.asset) else {
        return false;
    };
    gray_images_match(template, &crop_gray(strip, &probe.region), probe.max_distance)
}

/// Reads the number on the currently called ball from the top strip.
///
/// Returns an empty string whenever no settled ball is shown: a probe pixel
/// is too dark, a "no ball" background is visible, or (once the layout has
/// shifted) the shifted background is visible.
pub fn read_called_number(
    strip: &GrayImage,
    layout: &CalledBallLayout,
    templates: &Templates,
    layout_shifted: bool,
    ocr: &dyn DigitRecognizer,
) -> Result<String> {
    for probe in &layout.probes {
        let visible = strip
            .get_pixel_checked(probe.x, probe.y)
            .is_some_and(|p| p[0] >= probe.min_luma);
        if !visible {
            trace!("No ball: {} probe is dark", probe.name);
            return Ok(String::new());
        }
    }

    for probe in &layout.blank_templates {
        if template_matches(strip, probe, templates) {
            trace!("No ball: {} matches", probe.asset);
            return Ok(String::new());
        }
    }

    let ball = match (&layout.shifted, layout_shifted) {
        (Some(shifted), true) => {
            if template_matches(strip, &shifted.blank, templates) {
                trace!("No ball: {} matches", shifted.blank.asset);
                return Ok(String::new());
            }
            &shifted.ball
        }
        _ => &layout.ball,
    };

    let prepared = extract(strip, &ball.region, &ball.normalize);
    recognize_or_empty(ocr, &prepared)
}
