use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::layout::{Border, InkCrop, Normalize, Padding, Region};

/// Converts to 8-bit grayscale with the ITU-R BT.601 weights.
///
/// The card thresholds were tuned against this conversion, so it is used
/// instead of `DynamicImage::to_luma8`, which weighs channels differently.
pub fn to_gray(img: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = img {
        return gray.clone();
    }

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        let luma = (r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16;
        output.put_pixel(x, y, Luma([luma as u8]));
    }

    output
}

/// Pixel bounds of `region` after applying its buffer, clamped to the image.
fn crop_bounds(width: u32, height: u32, region: &Region) -> (u32, u32, u32, u32) {
    let x0 = (region.x + region.buffer).min(width);
    let y0 = (region.y + region.buffer).min(height);
    let x1 = (region.x + region.width).saturating_sub(region.buffer).clamp(x0, width);
    let y1 = (region.y + region.height).saturating_sub(region.buffer).clamp(y0, height);
    (x0, y0, x1 - x0, y1 - y0)
}

/// Crops a grayscale region, shrinking it by its buffer on every side.
pub fn crop_gray(img: &GrayImage, region: &Region) -> GrayImage {
    let (x, y, w, h) = crop_bounds(img.width(), img.height(), region);
    image::imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Crops a color region, shrinking it by its buffer on every side.
pub fn crop_color(img: &DynamicImage, region: &Region) -> DynamicImage {
    let (x, y, w, h) = crop_bounds(img.width(), img.height(), region);
    img.crop_imm(x, y, w, h)
}

/// Keeps the top `1/divisor` of the image.
pub fn top_strip(img: &GrayImage, divisor: u32) -> GrayImage {
    let height = img.height() / divisor.max(1);
    image::imageops::crop_imm(img, 0, 0, img.width(), height).to_image()
}

/// Pixels brighter than `threshold` become white, all others black.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    output
}

/// Bounding box `(left, top, right, bottom)` of pixels darker than
/// `threshold`; right and bottom are exclusive.
pub fn ink_bbox(img: &GrayImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bbox: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel[0] >= threshold {
            continue;
        }
        bbox = Some(match bbox {
            None => (x, y, x + 1, y + 1),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x + 1), b.max(y + 1)),
        });
    }

    bbox
}

/// Re-frames a glyph around its ink. Images without ink are returned as is.
pub fn crop_to_ink(img: &GrayImage, ink: &InkCrop) -> GrayImage {
    match *ink {
        InkCrop::Horizontal { threshold, left, right } => {
            let Some((l, _, r, _)) = ink_bbox(img, threshold) else {
                return img.clone();
            };
            // The frame may reach one pixel past the right and bottom edges;
            // that margin reads as black.
            let x0 = l.saturating_sub(left);
            let x1 = (r + right).min(img.width() + 1);
            let mut output = GrayImage::new(x1 - x0, img.height() + 1);
            image::imageops::replace(&mut output, img, -(x0 as i64), 0);
            output
        }
        InkCrop::Boxed { threshold, padding } => {
            let Some((l, t, r, b)) = ink_bbox(img, threshold) else {
                return img.clone();
            };
            let glyph = image::imageops::crop_imm(img, l, t, r - l, b - t).to_image();
            paste_on_canvas(&glyph, padding, 255)
        }
    }
}

fn paste_on_canvas(img: &GrayImage, padding: Padding, fill: u8) -> GrayImage {
    let width = img.width() + padding.left + padding.right;
    let height = img.height() + padding.top + padding.bottom;
    let mut canvas = GrayImage::from_pixel(width, height, Luma([fill]));
    image::imageops::replace(&mut canvas, img, padding.left as i64, padding.top as i64);
    canvas
}

/// Adds a solid frame around the image.
pub fn add_border(img: &GrayImage, border: &Border) -> GrayImage {
    paste_on_canvas(img, border.padding, border.fill)
}

/// Rotates about the center without growing the canvas; uncovered corners are black.
pub fn rotate_clockwise(img: &GrayImage, degrees: f32) -> GrayImage {
    rotate_about_center(img, degrees.to_radians(), Interpolation::Nearest, Luma([0]))
}

/// Runs the preparation steps of `normalize` in order.
pub fn normalize(img: &GrayImage, normalize: &Normalize) -> GrayImage {
    let mut output = match normalize.binarize {
        Some(threshold) => binarize(img, threshold),
        None => img.clone(),
    };
    if let Some(ink) = &normalize.ink {
        output = crop_to_ink(&output, ink);
    }
    if let Some(threshold) = normalize.binarize_after {
        output = binarize(&output, threshold);
    }
    if let Some(degrees) = normalize.rotate_clockwise_degrees {
        output = rotate_clockwise(&output, degrees);
    }
    if let Some(border) = &normalize.border {
        output = add_border(&output, border);
    }
    output
}

/// Crops `region` from `img` and prepares it for OCR.
pub fn extract(img: &GrayImage, region: &Region, steps: &Normalize) -> GrayImage {
    normalize(&crop_gray(img, region), steps)
}
