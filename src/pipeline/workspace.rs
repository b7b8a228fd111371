//! Local working area.
//!
//! ```text
//! <root>/{aggregate_id}/{item_id}/original.jpg
//! <root>/{aggregate_id}/{item_id}/cubemap/{face}.jpg
//! <root>/{aggregate_id}/{item_id}/thumbnail.jpg
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::slicer::THUMBNAIL_FILE_NAME;

/// File name of a staged source image.
pub const ORIGINAL_FILE_NAME: &str = "original.jpg";

/// Directory holding the six faces.
pub const CUBEMAP_DIR_NAME: &str = "cubemap";

/// Root of all working directories.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn aggregate_dir(&self, aggregate_id: &str) -> PathBuf {
        self.root.join(aggregate_id)
    }

    pub fn item_dir(&self, aggregate_id: &str, item_id: &str) -> PathBuf {
        self.aggregate_dir(aggregate_id).join(item_id)
    }

    pub fn original_path(&self, aggregate_id: &str, item_id: &str) -> PathBuf {
        self.item_dir(aggregate_id, item_id).join(ORIGINAL_FILE_NAME)
    }

    pub fn cubemap_dir(&self, aggregate_id: &str, item_id: &str) -> PathBuf {
        self.item_dir(aggregate_id, item_id).join(CUBEMAP_DIR_NAME)
    }

    pub fn thumbnail_path(&self, aggregate_id: &str, item_id: &str) -> PathBuf {
        self.item_dir(aggregate_id, item_id)
            .join(THUMBNAIL_FILE_NAME)
    }

    /// Write a source image to its staged location, creating directories.
    pub async fn stage_original(
        &self,
        aggregate_id: &str,
        item_id: &str,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dir = self.item_dir(aggregate_id, item_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(ORIGINAL_FILE_NAME);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Remove a directory tree. A missing directory is not an error.
    pub async fn remove_dir(path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
