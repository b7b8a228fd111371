//! Processing pipeline.
//!
//! The [`Orchestrator`] accepts submissions, stages their panoramas in the
//! local [`Workspace`], and runs one task per panorama under the shared
//! [`AdmissionPool`]. All status changes go through a [`StatusRepository`].

mod admission;
mod orchestrator;
mod repository;
mod status;
mod workspace;

pub use admission::{AdmissionPermit, AdmissionPool, DEFAULT_SLICE_CONCURRENCY};
pub use orchestrator::{Orchestrator, SourceUpload, SubmitRequest, Submission};
pub use repository::{MemoryRepository, StatusRepository};
pub use status::{
    AggregateRecord, AggregateStatus, ItemRecord, ItemStatus, PublicView, StatusReport,
};
pub use workspace::{Workspace, CUBEMAP_DIR_NAME, ORIGINAL_FILE_NAME};
