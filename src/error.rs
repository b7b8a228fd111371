use std::time::Duration;

use thiserror::Error;

/// Errors raised by the cubemap projector.
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// Face index outside 0-5
    #[error("Invalid cube face index: {0} (expected 0-5)")]
    InvalidFace(usize),
}

/// Errors that can occur while slicing a panorama into cubemap faces.
#[derive(Debug, Clone, Error)]
pub enum SliceError {
    /// Source image could not be opened or decoded
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    /// Source decoded but is too small to yield a non-empty face
    #[error("Panorama too small: {width}x{height} (width must be at least 4 pixels)")]
    TooSmall { width: u32, height: u32 },

    /// A face (or the output directory) could not be written
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Errors from remote object storage.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// PutObject rejected or unreachable store
    #[error("Upload failed for {key}: {message}")]
    Upload { key: String, message: String },

    /// DeleteObject failed
    #[error("Delete failed for {key}: {message}")]
    Delete { key: String, message: String },

    /// ListObjects failed while resolving a prefix
    #[error("Listing failed for prefix {prefix}: {message}")]
    List { prefix: String, message: String },

    /// Upload exceeded the configured deadline
    #[error("Upload timed out for {key} after {limit:?}")]
    Timeout { key: String, limit: Duration },

    /// The local artifact could not be read
    #[error("Local file error for {path}: {message}")]
    LocalFile { path: String, message: String },

    /// Any other S3 error (e.g. connectivity probe)
    #[error("S3 error: {0}")]
    S3(String),
}

/// Errors from the status repository.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Record with the same identifier already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Status change not allowed by the state machine
    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    /// Backend failure
    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Errors from the magic-code allocator.
#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    /// Every code of the configured length is already allocated
    #[error("Magic code space exhausted: all {codespace} codes of length {length} are in use")]
    Exhausted { length: usize, codespace: u128 },
}

/// Failure of a single processing task. Never surfaced to the submitter;
/// converted into the item's `error` status at the task boundary.
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    /// Slicing failed
    #[error("Slice error: {0}")]
    Slice(#[from] SliceError),

    /// A mandatory upload failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The admission pool was shut down before a permit was granted
    #[error("Admission pool closed")]
    AdmissionClosed,

    /// The blocking slice job panicked or was aborted
    #[error("Slice job failed: {0}")]
    Join(String),
}

/// Errors returned synchronously from a submission.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// No source images in the request
    #[error("No panoramas uploaded")]
    NoImages,

    /// A source image could not be written to the working area
    #[error("Failed to stage {path}: {message}")]
    Staging { path: String, message: String },

    /// Magic code allocation failed for a public aggregate
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Records could not be persisted
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors returned from status, visibility, view and deletion operations.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Unknown aggregate identifier
    #[error("Aggregate not found: {0}")]
    AggregateNotFound(String),

    /// Unknown magic code, or its aggregate is private or deactivated
    #[error("Public aggregate not found for code: {0}")]
    MagicCodeNotFound(String),

    /// Repository error
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Storage error during artifact cleanup
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Magic code allocation failed
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Local working-area cleanup failed
    #[error("Failed to remove {path}: {message}")]
    LocalCleanup { path: String, message: String },
}
