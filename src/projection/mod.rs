//! Spherical projection from equirectangular panoramas to cube faces.
//!
//! ```text
//!            ┌──────┐
//!            │ posy │
//!     ┌──────┼──────┼──────┬──────┐
//!     │ negx │ posz │ posx │ negz │
//!     └──────┼──────┼──────┴──────┘
//!            │ negy │
//!            └──────┘
//! ```
//!
//! The projector is pure: no I/O and no shared state. See [`extract_face`].

mod face;
mod projector;

pub use face::CubeFace;
pub use projector::{extract_face, extract_face_index, spherical_angles, OUT_OF_BOUNDS_PIXEL};
