//! Average-color classification of boost slots and banners.

use image::{DynamicImage, GenericImageView};

/// Distance below which two average colors are considered the same icon.
pub const DEFAULT_COLOR_THRESHOLD: f64 = 40.0;

/// Mean color of an image as RGBA.
///
/// Grayscale means are spread over the three color channels and images
/// without an alpha channel get full alpha, so any two images compare in
/// the same 4-channel space.
pub fn average_color(img: &DynamicImage) -> [f64; 4] {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return [0.0, 0.0, 0.0, 255.0];
    }
    let count = (width as f64) * (height as f64);
    let color = img.color();

    if !color.has_color() {
        let gray = img.to_luma_alpha8();
        let (mut luma, mut alpha) = (0.0, 0.0);
        for pixel in gray.pixels() {
            luma += pixel[0] as f64;
            alpha += pixel[1] as f64;
        }
        let luma = luma / count;
        let alpha = if color.has_alpha() { alpha / count } else { 255.0 };
        return [luma, luma, luma, alpha];
    }

    let rgba = img.to_rgba8();
    let mut sums = [0.0f64; 4];
    for pixel in rgba.pixels() {
        for (sum, value) in sums.iter_mut().zip(pixel.0) {
            *sum += value as f64;
        }
    }
    let alpha = if color.has_alpha() { sums[3] / count } else { 255.0 };
    [sums[0] / count, sums[1] / count, sums[2] / count, alpha]
}

/// Euclidean distance between two RGBA colors.
pub fn color_difference(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// True when the two images' average colors are within `threshold`.
pub fn colors_match(a: &DynamicImage, b: &DynamicImage, threshold: f64) -> bool {
    color_difference(&average_color(a), &average_color(b)) < threshold
}

/// Classifies a region against named reference images by average color.
///
/// References are checked in the order given; the first one within the
/// threshold wins even if a later one is closer.
#[derive(Clone, Debug)]
pub struct ColorClassifier<T> {
    references: Vec<(T, [f64; 4])>,
    threshold: f64,
}

impl<T: Copy> ColorClassifier<T> {
    pub fn new<'a>(references: impl IntoIterator<Item = (T, &'a DynamicImage)>) -> Self {
        Self {
            references: references
                .into_iter()
                .map(|(label, img)| (label, average_color(img)))
                .collect(),
            threshold: DEFAULT_COLOR_THRESHOLD,
        }
    }

    pub fn classify(&self, region: &DynamicImage) -> Option<T> {
        let color = average_color(region);
        self.references
            .iter()
            .find(|(_, reference)| color_difference(&color, reference) < self.threshold)
            .map(|(label, _)| *label)
    }
}
