//! Six-face slicing of one panorama.

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use tracing::{debug, warn};

use crate::error::SliceError;
use crate::projection::{extract_face, CubeFace};

use super::encoder::{clamp_quality, write_jpeg, DEFAULT_JPEG_QUALITY};
use super::thumbnail::{write_thumbnail, DEFAULT_THUMBNAIL_SIZE};

/// File name of the thumbnail written next to the cubemap directory.
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

/// Files produced by one slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceOutput {
    /// Face paths in [`CubeFace::ALL`] order
    pub faces: Vec<PathBuf>,

    /// Thumbnail path, `None` if thumbnail generation failed
    pub thumbnail: Option<PathBuf>,

    /// Edge length of every face
    pub face_size: u32,
}

impl SliceOutput {
    /// Path of a specific face.
    pub fn face_path(&self, face: CubeFace) -> &Path {
        &self.faces[face.index()]
    }
}

/// Slices equirectangular panoramas into cubemap faces plus a thumbnail.
///
/// Stateless apart from its output settings; cheap to clone into blocking
/// tasks.
#[derive(Debug, Clone)]
pub struct Slicer {
    jpeg_quality: u8,
    thumbnail_size: u32,
}

impl Slicer {
    /// Create a slicer with default quality (90) and thumbnail size (512).
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    /// Set the JPEG quality used for faces and thumbnail.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = clamp_quality(quality);
        self
    }

    /// Set the thumbnail edge length.
    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size;
        self
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn thumbnail_size(&self) -> u32 {
        self.thumbnail_size
    }

    /// Slice the panorama at `source` into `output_dir`.
    ///
    /// Writes `{posx,negx,posy,negy,posz,negz}.jpg` into `output_dir`
    /// (created if absent) and `thumbnail.jpg` into its parent directory.
    ///
    /// # Errors
    ///
    /// - [`SliceError::Decode`] if the source cannot be opened or decoded
    /// - [`SliceError::TooSmall`] if the source is narrower than 4 pixels
    /// - [`SliceError::Write`] if the directory or any face cannot be written
    ///
    /// Thumbnail failures are logged and reported as `thumbnail: None`.
    pub fn slice(&self, source: &Path, output_dir: &Path) -> Result<SliceOutput, SliceError> {
        let panorama = decode_panorama(source)?;
        self.slice_image(&panorama, output_dir)
    }

    /// Slice an already decoded panorama.
    pub fn slice_image(
        &self,
        panorama: &RgbImage,
        output_dir: &Path,
    ) -> Result<SliceOutput, SliceError> {
        let (width, height) = panorama.dimensions();
        let face_size = width / 4;
        if face_size == 0 || height == 0 {
            return Err(SliceError::TooSmall { width, height });
        }

        std::fs::create_dir_all(output_dir).map_err(|e| SliceError::Write {
            path: output_dir.display().to_string(),
            message: e.to_string(),
        })?;

        debug!(
            width,
            height,
            face_size,
            output = %output_dir.display(),
            "Slicing panorama"
        );

        let mut faces = Vec::with_capacity(CubeFace::ALL.len());
        let mut front = None;

        for face in CubeFace::ALL {
            let image = extract_face(panorama, face, face_size);
            let path = output_dir.join(face.file_name());
            write_jpeg(&image, &path, self.jpeg_quality)?;
            faces.push(path);

            if face == CubeFace::PosZ {
                front = Some(image);
            }
        }

        let thumbnail = front.and_then(|image| self.thumbnail(&image, output_dir));

        Ok(SliceOutput {
            faces,
            thumbnail,
            face_size,
        })
    }

    fn thumbnail(&self, front: &RgbImage, output_dir: &Path) -> Option<PathBuf> {
        let path = thumbnail_path(output_dir);
        match write_thumbnail(front, self.thumbnail_size, &path, self.jpeg_quality) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, "Thumbnail generation failed, continuing without it");
                None
            }
        }
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the thumbnail for a cubemap directory is written.
pub fn thumbnail_path(output_dir: &Path) -> PathBuf {
    output_dir
        .parent()
        .unwrap_or(output_dir)
        .join(THUMBNAIL_FILE_NAME)
}

/// Open and decode a panorama, sniffing the format from its contents.
pub fn decode_panorama(source: &Path) -> Result<RgbImage, SliceError> {
    let decode_error = |message: String| SliceError::Decode {
        path: source.display().to_string(),
        message,
    };

    let image = ImageReader::open(source)
        .map_err(|e| decode_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    Ok(image.to_rgb8())
}
