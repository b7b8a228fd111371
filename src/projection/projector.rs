//! Equirectangular to cube face projection.
//!
//! Every destination pixel is mapped to a direction on the unit cube, the
//! direction is converted to spherical angles, and the angles select a source
//! pixel by nearest-neighbour lookup.
//!
//! # Sampling at the seam and poles
//!
//! Source coordinates are not clamped. Directions with `phi == π` map to
//! `srcX == width` and the bottom pole maps to `srcY == height`; those samples
//! fall outside the panorama and produce black pixels.

use std::f64::consts::PI;

use image::{Rgb, RgbImage};

use crate::error::ProjectionError;

use super::face::CubeFace;

/// Colour written for samples that fall outside the source bounds.
pub const OUT_OF_BOUNDS_PIXEL: Rgb<u8> = Rgb([0, 0, 0]);

/// Extract one cube face from an equirectangular panorama.
///
/// # Arguments
///
/// * `source` - Equirectangular panorama (2:1 assumed, not enforced)
/// * `face` - Which face to render
/// * `face_size` - Edge length of the output square
pub fn extract_face(source: &RgbImage, face: CubeFace, face_size: u32) -> RgbImage {
    let mut output = RgbImage::new(face_size, face_size);
    if face_size == 0 {
        return output;
    }

    let size = face_size as f64;
    let src_width = source.width() as f64;
    let src_height = source.height() as f64;

    for y in 0..face_size {
        for x in 0..face_size {
            let u = 2.0 * x as f64 / size - 1.0;
            let v = 2.0 * y as f64 / size - 1.0;

            let [vx, vy, vz] = face.direction(u, v);
            let (phi, theta) = spherical_angles(vx, vy, vz);

            let src_x = (phi / (2.0 * PI) + 0.5) * src_width;
            let src_y = (0.5 - theta / PI) * src_height;

            output.put_pixel(x, y, sample_nearest(source, src_x, src_y));
        }
    }

    output
}

/// Extract a face by numeric index (0-5).
pub fn extract_face_index(
    source: &RgbImage,
    index: usize,
    face_size: u32,
) -> Result<RgbImage, ProjectionError> {
    let face = CubeFace::from_index(index)?;
    Ok(extract_face(source, face, face_size))
}

/// Azimuth `phi` and elevation `theta` of a direction vector.
#[inline]
pub fn spherical_angles(vx: f64, vy: f64, vz: f64) -> (f64, f64) {
    let phi = vx.atan2(vz);
    let theta = vy.atan2((vx * vx + vz * vz).sqrt());
    (phi, theta)
}

/// Nearest-neighbour lookup; coordinates are truncated toward zero.
#[inline]
fn sample_nearest(source: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let sx = x as i64;
    let sy = y as i64;

    if sx < 0 || sy < 0 || sx >= source.width() as i64 || sy >= source.height() as i64 {
        return OUT_OF_BOUNDS_PIXEL;
    }

    *source.get_pixel(sx as u32, sy as u32)
}
