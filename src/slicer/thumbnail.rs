//! Thumbnail derivation from the front face.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::error::SliceError;

use super::encoder::write_jpeg;

/// Default thumbnail edge length in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 512;

/// Resize `face` to `size`×`size` by filling and center-cropping, using a
/// Lanczos filter.
pub fn fill_thumbnail(face: &RgbImage, size: u32) -> RgbImage {
    DynamicImage::ImageRgb8(face.clone())
        .resize_to_fill(size, size, FilterType::Lanczos3)
        .to_rgb8()
}

/// Build the thumbnail and write it to `path`.
pub fn write_thumbnail(
    face: &RgbImage,
    size: u32,
    path: &Path,
    quality: u8,
) -> Result<(), SliceError> {
    let thumbnail = fill_thumbnail(face, size);
    write_jpeg(&thumbnail, path, quality)
}
