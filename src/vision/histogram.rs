//! Histogram comparison against reference screens.

use image::{DynamicImage, GrayImage};

/// Per-channel histogram: 256 bins for grayscale, 256 per channel otherwise
/// (R, G, B and A when present), channels concatenated.
pub fn histogram(img: &DynamicImage) -> Vec<u64> {
    let color = img.color();

    if !color.has_color() {
        return gray_histogram(&img.to_luma8());
    }

    let channels = if color.has_alpha() { 4 } else { 3 };
    let mut bins = vec![0u64; 256 * channels];
    for pixel in img.to_rgba8().pixels() {
        for c in 0..channels {
            bins[c * 256 + pixel[c] as usize] += 1;
        }
    }
    bins
}

pub fn gray_histogram(img: &GrayImage) -> Vec<u64> {
    let mut bins = vec![0u64; 256];
    for pixel in img.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    bins
}

/// Summed absolute bin difference over the bins both histograms have.
pub fn histogram_distance(a: &[u64], b: &[u64]) -> u64 {
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).sum()
}

/// True when the two images' histograms differ by less than `max_distance`.
pub fn images_match(a: &DynamicImage, b: &DynamicImage, max_distance: u64) -> bool {
    histogram_distance(&histogram(a), &histogram(b)) < max_distance
}

pub fn gray_images_match(a: &GrayImage, b: &GrayImage, max_distance: u64) -> bool {
    histogram_distance(&gray_histogram(a), &gray_histogram(b)) < max_distance
}
