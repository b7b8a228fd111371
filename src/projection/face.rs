//! Cube face identities and their fixed direction bases.

use std::fmt;

use crate::error::ProjectionError;

/// One of the six faces of a cubemap.
///
/// The discriminant is the face index used throughout the pipeline, and the
/// order of [`CubeFace::ALL`] is the order in which faces are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// Right (+X)
    PosX = 0,
    /// Left (-X)
    NegX = 1,
    /// Top (+Y)
    PosY = 2,
    /// Bottom (-Y)
    NegY = 3,
    /// Front (+Z)
    PosZ = 4,
    /// Back (-Z)
    NegZ = 5,
}

impl CubeFace {
    /// All faces in production order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Look up a face by index (0-5).
    pub fn from_index(index: usize) -> Result<Self, ProjectionError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ProjectionError::InvalidFace(index))
    }

    /// Face index (0-5).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short orientation name, e.g. `posz`.
    pub fn name(self) -> &'static str {
        match self {
            CubeFace::PosX => "posx",
            CubeFace::NegX => "negx",
            CubeFace::PosY => "posy",
            CubeFace::NegY => "negy",
            CubeFace::PosZ => "posz",
            CubeFace::NegZ => "negz",
        }
    }

    /// File name of the encoded face, e.g. `posz.jpg`.
    pub fn file_name(self) -> String {
        format!("{}.jpg", self.name())
    }

    /// Direction vector for normalized face coordinates `(u, v)` in [-1, 1].
    ///
    /// This basis table determines face orientation ("front" is +Z) and must
    /// not be altered.
    #[inline]
    pub fn direction(self, u: f64, v: f64) -> [f64; 3] {
        match self {
            CubeFace::PosX => [1.0, -v, -u],
            CubeFace::NegX => [-1.0, -v, u],
            CubeFace::PosY => [u, 1.0, v],
            CubeFace::NegY => [u, -1.0, -v],
            CubeFace::PosZ => [u, -v, 1.0],
            CubeFace::NegZ => [-u, -v, -1.0],
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
