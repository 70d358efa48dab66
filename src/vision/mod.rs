//! Image primitives shared by the recognizers: cropping and glyph
//! normalization, average-color matching and histogram matching.

pub mod color;
pub mod histogram;
pub mod preprocess;

pub use color::{colors_match, ColorClassifier, DEFAULT_COLOR_THRESHOLD};
pub use histogram::{gray_images_match, images_match};
pub use preprocess::{crop_color, crop_gray, extract, to_gray, top_strip};
