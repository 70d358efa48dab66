//! Whole-screen checks: game start, game over and the boost slots.

use image::DynamicImage;

use crate::game::boost::{Boost, BoostSlots};
use crate::layout::VariantLayout;
use crate::pool::WorkerPool;
use crate::vision::{colors_match, crop_color, images_match, ColorClassifier, DEFAULT_COLOR_THRESHOLD};

/// True when the start banner matches the game start reference.
pub fn board_is_ready(image: &DynamicImage, layout: &VariantLayout, reference: &DynamicImage) -> bool {
    let banner = crop_color(image, &layout.start_banner);
    images_match(&banner, reference, layout.start_max_distance)
}

/// True when the game over banner has the reference's average color.
pub fn is_game_over(image: &DynamicImage, layout: &VariantLayout, reference: &DynamicImage) -> bool {
    let banner = crop_color(image, &layout.game_over_banner);
    colors_match(&banner, reference, DEFAULT_COLOR_THRESHOLD)
}

/// Classifies every boost slot of the frame.
pub fn read_slots<B: Boost>(
    image: &DynamicImage,
    layout: &VariantLayout,
    classifier: &ColorClassifier<B>,
    pool: &WorkerPool,
) -> BoostSlots<B> {
    BoostSlots::new(pool.map(&layout.slots, |region| {
        classifier.classify(&crop_color(image, region))
    }))
}
