//! JPEG output for faces and thumbnails.
//!
//! Faces are always re-encoded from the projected pixels; the quality is
//! fixed per [`Slicer`](super::Slicer) instance.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::SliceError;

/// Default JPEG quality for faces and thumbnails (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Encode `image` as JPEG and write it to `path`.
///
/// # Errors
///
/// Returns [`SliceError::Write`] if the file cannot be created, the encoder
/// rejects the image, or the final flush fails.
pub fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), SliceError> {
    let write_error = |message: String| SliceError::Write {
        path: path.display().to_string(),
        message,
    };

    let file = File::create(path).map_err(|e| write_error(e.to_string()))?;
    let mut writer = BufWriter::new(file);

    let mut encoder = JpegEncoder::new_with_quality(&mut writer, clamp_quality(quality));
    encoder
        .encode_image(image)
        .map_err(|e| write_error(e.to_string()))?;

    writer.flush().map_err(|e| write_error(e.to_string()))?;
    Ok(())
}

/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to the valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}
