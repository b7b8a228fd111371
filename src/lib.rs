//! # panocube
//!
//! A media pipeline that turns equirectangular 360° panoramas into cubemaps.
//!
//! Each uploaded panorama is projected into six square faces plus a
//! thumbnail, uploaded to S3-compatible object storage, and tracked through
//! a small status state machine. Tours can be shared through short magic
//! codes with throttled view counting.
//!
//! ## Features
//!
//! - **Exact projection**: nearest-neighbour cubemap extraction with a fixed
//!   per-face basis
//! - **Bounded concurrency**: one global admission pool shared by all tours
//! - **Independent items**: one failed panorama never blocks its siblings
//! - **Local-only mode**: runs without object storage, keeping artifacts on disk
//!
//! ## Architecture
//!
//! - [`projection`] - Cube faces and the per-pixel projector
//! - [`slicer`] - Six-face slicing, JPEG encoding and thumbnails
//! - [`storage`] - Object store trait, key layout and S3 implementation
//! - [`access`] - Magic codes and view throttling
//! - [`pipeline`] - Orchestrator, admission pool and status repository
//! - [`server`] - Axum-based HTTP API
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use panocube::{AdmissionPool, MemoryRepository, Orchestrator, SourceUpload, SubmitRequest, Workspace};
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(MemoryRepository::new()),
//!         Arc::new(AdmissionPool::new(2)),
//!         Workspace::new("./uploads"),
//!     );
//!
//!     let data = std::fs::read("pano.jpg").unwrap();
//!     let submission = orchestrator
//!         .submit(SubmitRequest {
//!             owner_id: "alice".to_string(),
//!             name: "Lobby".to_string(),
//!             is_public: false,
//!             uploads: vec![SourceUpload::new("pano.jpg", data)],
//!         })
//!         .await
//!         .unwrap();
//!
//!     let id = submission.aggregate.id.clone();
//!     submission.join().await.unwrap();
//!     println!("{:?}", orchestrator.status(&id).await.unwrap().status);
//! }
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod projection;
pub mod server;
pub mod slicer;
pub mod storage;

// Re-export commonly used types
pub use access::{
    generate_code, CodeRegistry, MagicCodeAllocator, MemoryCodeRegistry, ViewKey, ViewThrottle,
    DEFAULT_MAGIC_CODE_LENGTH, DEFAULT_VIEW_CACHE_CAPACITY, DEFAULT_VIEW_COOLDOWN,
};
pub use config::{Cli, Command, ServeConfig, SliceConfig};
pub use error::{
    AllocationError, PipelineError, ProcessingError, ProjectionError, RepositoryError,
    SliceError, StorageError, SubmitError,
};
pub use pipeline::{
    AdmissionPermit, AdmissionPool, AggregateRecord, AggregateStatus, ItemRecord, ItemStatus,
    MemoryRepository, Orchestrator, PublicView, SourceUpload, StatusReport, StatusRepository,
    SubmitRequest, Submission, Workspace, DEFAULT_SLICE_CONCURRENCY,
};
pub use projection::{extract_face, extract_face_index, spherical_angles, CubeFace};
pub use server::{create_router, ApiError, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use slicer::{
    decode_panorama, SliceOutput, Slicer, DEFAULT_JPEG_QUALITY, DEFAULT_THUMBNAIL_SIZE,
};
pub use storage::{create_s3_client, ObjectStore, S3ObjectStore, JPEG_CONTENT_TYPE};
