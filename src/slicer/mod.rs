//! Panorama slicing.
//!
//! Drives the [projector](crate::projection) over all six faces of one source
//! image and writes the results to a working directory:
//!
//! ```text
//! <item>/
//! ├── original.jpg
//! ├── thumbnail.jpg        512×512 fill of posz (best effort)
//! └── cubemap/
//!     ├── posx.jpg
//!     ├── negx.jpg
//!     ├── posy.jpg
//!     ├── negy.jpg
//!     ├── posz.jpg
//!     └── negz.jpg
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use panocube::slicer::Slicer;
//!
//! let output = Slicer::new()
//!     .slice(Path::new("uploads/a/b/original.jpg"), Path::new("uploads/a/b/cubemap"))
//!     .expect("slice");
//! println!("{} faces of {}px", output.faces.len(), output.face_size);
//! ```

mod cubemap;
mod encoder;
mod thumbnail;

pub use cubemap::{decode_panorama, thumbnail_path, SliceOutput, Slicer, THUMBNAIL_FILE_NAME};
pub use encoder::{
    clamp_quality, is_valid_quality, write_jpeg, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};
pub use thumbnail::{fill_thumbnail, DEFAULT_THUMBNAIL_SIZE};
