//! Remote object storage.
//!
//! The pipeline talks to storage only through [`ObjectStore`], so the
//! orchestrator can run against S3, an S3-compatible service (R2, MinIO), a
//! test double, or nothing at all (local-only mode).

pub mod keys;
mod s3;

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;

pub use keys::{
    aggregate_prefix, face_key, item_artifact_keys, item_prefix, original_key, thumbnail_key,
    JPEG_CONTENT_TYPE,
};
pub use s3::{create_s3_client, S3ObjectStore};

/// Object storage operations used by the pipeline.
///
/// Failures are independent per key: a failed upload never affects other
/// keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` under `key`.
    async fn upload(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Delete a single object.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every object whose key starts with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}
