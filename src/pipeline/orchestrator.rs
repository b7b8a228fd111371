//! Submission handling and per-item processing tasks.
//!
//! ```text
//! submit ──► stage originals ──► persist records ──► spawn one task per item
//!                                                          │
//!          ┌───────────────────────────────────────────────┘
//!          ▼
//!   acquire permit ─► slice (blocking pool) ─► upload ─► clean up ─► status
//!                                                                     │
//!                                   last item of the aggregate ◄──────┘
//!                                   marks the aggregate ready
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::admission::AdmissionPool;
use super::repository::StatusRepository;
use super::status::{
    AggregateRecord, AggregateStatus, ItemRecord, ItemStatus, PublicView, StatusReport,
};
use super::workspace::Workspace;
use crate::access::{MagicCodeAllocator, ViewThrottle};
use crate::error::{
    PipelineError, ProcessingError, RepositoryError, StorageError, SubmitError,
};
use crate::projection::CubeFace;
use crate::slicer::{SliceOutput, Slicer};
use crate::storage::{
    aggregate_prefix, face_key, original_key, thumbnail_key, ObjectStore, JPEG_CONTENT_TYPE,
};

// =============================================================================
// Requests
// =============================================================================

/// One uploaded panorama.
#[derive(Debug, Clone)]
pub struct SourceUpload {
    /// Client-side file name, kept for logging
    pub file_name: String,
    pub data: Bytes,
}

impl SourceUpload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// A new aggregate with its panoramas.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub owner_id: String,
    pub name: String,
    pub is_public: bool,
    pub uploads: Vec<SourceUpload>,
}

/// Records created by [`Orchestrator::submit`] and handles to the spawned
/// tasks.
///
/// Dropping a submission detaches its tasks; they keep running.
#[derive(Debug)]
pub struct Submission {
    pub aggregate: AggregateRecord,
    pub items: Vec<ItemRecord>,
    tasks: Vec<JoinHandle<()>>,
}

impl Submission {
    /// Wait for every processing task of this submission.
    pub async fn join(self) -> Result<(), ProcessingError> {
        for task in self.tasks {
            task.await
                .map_err(|e| ProcessingError::Join(e.to_string()))?;
        }
        Ok(())
    }
}

/// Work description handed to one processing task.
struct ItemJob {
    aggregate_id: String,
    item_id: String,
    remaining: Arc<AtomicUsize>,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives submissions through slicing and upload and owns every status
/// write.
///
/// Cheap to clone; clones share the repository, store, admission pool,
/// allocator and throttle.
#[derive(Clone)]
pub struct Orchestrator {
    repository: Arc<dyn StatusRepository>,
    store: Option<Arc<dyn ObjectStore>>,
    admission: Arc<AdmissionPool>,
    slicer: Slicer,
    allocator: Arc<MagicCodeAllocator>,
    throttle: Arc<ViewThrottle>,
    workspace: Workspace,
    upload_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Create an orchestrator in local-only mode with default slicer,
    /// allocator and throttle.
    pub fn new(
        repository: Arc<dyn StatusRepository>,
        admission: Arc<AdmissionPool>,
        workspace: Workspace,
    ) -> Self {
        Self {
            repository,
            store: None,
            admission,
            slicer: Slicer::new(),
            allocator: Arc::new(MagicCodeAllocator::in_memory()),
            throttle: Arc::new(ViewThrottle::new()),
            workspace,
            upload_timeout: None,
        }
    }

    /// Upload artifacts to `store` and remove local copies afterwards.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_slicer(mut self, slicer: Slicer) -> Self {
        self.slicer = slicer;
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<MagicCodeAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_throttle(mut self, throttle: Arc<ViewThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fail any single upload that takes longer than `timeout`.
    pub fn with_upload_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn admission(&self) -> &AdmissionPool {
        &self.admission
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn repository(&self) -> &Arc<dyn StatusRepository> {
        &self.repository
    }

    /// Whether artifacts are uploaded to a remote store.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    // -------------------------------------------------------------------------
    // Submit
    // -------------------------------------------------------------------------

    /// Accept a new aggregate and start processing its items.
    ///
    /// Records are persisted with status `processing` before this returns.
    /// Processing failures are never reported here; they end up in the
    /// item's status.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission, SubmitError> {
        if request.uploads.is_empty() {
            return Err(SubmitError::NoImages);
        }

        let aggregate_id = Uuid::new_v4().to_string();
        let magic_code = if request.is_public {
            Some(self.allocator.allocate().await?)
        } else {
            None
        };

        // Stage every source before any record exists
        let mut staged = Vec::with_capacity(request.uploads.len());
        for upload in &request.uploads {
            let item_id = Uuid::new_v4().to_string();
            if let Err(e) = self
                .workspace
                .stage_original(&aggregate_id, &item_id, &upload.data)
                .await
            {
                let path = self.workspace.original_path(&aggregate_id, &item_id);
                self.abort_submission(&aggregate_id, magic_code.as_deref())
                    .await;
                return Err(SubmitError::Staging {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
            debug!(
                aggregate_id = %aggregate_id,
                item_id = %item_id,
                file_name = %upload.file_name,
                bytes = upload.data.len(),
                "Staged panorama"
            );
            staged.push((item_id, upload.data.len() as u64));
        }

        let items: Vec<ItemRecord> = staged
            .into_iter()
            .enumerate()
            .map(|(ordinal, (item_id, size))| ItemRecord {
                local_path: self
                    .workspace
                    .item_dir(&aggregate_id, &item_id)
                    .display()
                    .to_string(),
                id: item_id,
                aggregate_id: aggregate_id.clone(),
                name: format!("Scene {}", ordinal + 1),
                status: ItemStatus::Processing,
                ordinal,
                size,
            })
            .collect();

        let aggregate = AggregateRecord {
            id: aggregate_id.clone(),
            owner_id: request.owner_id,
            name: request.name,
            status: AggregateStatus::Processing,
            size: items.iter().map(|item| item.size).sum(),
            is_public: request.is_public,
            is_active: true,
            magic_code: magic_code.clone(),
            views: 0,
            primary_path: items.first().map(|item| item.local_path.clone()),
            created_at: Utc::now(),
        };

        if let Err(e) = self.persist(&aggregate, &items).await {
            // Records may be partially written
            let _ = self.repository.delete_aggregate(&aggregate_id).await;
            self.abort_submission(&aggregate_id, magic_code.as_deref())
                .await;
            return Err(e.into());
        }

        info!(
            aggregate_id = %aggregate_id,
            items = items.len(),
            bytes = aggregate.size,
            public = aggregate.is_public,
            "Accepted submission"
        );

        let remaining = Arc::new(AtomicUsize::new(items.len()));
        let tasks = items
            .iter()
            .map(|item| {
                let job = ItemJob {
                    aggregate_id: aggregate_id.clone(),
                    item_id: item.id.clone(),
                    remaining: remaining.clone(),
                };
                tokio::spawn(self.clone().run_item(job))
            })
            .collect();

        Ok(Submission {
            aggregate,
            items,
            tasks,
        })
    }

    async fn persist(
        &self,
        aggregate: &AggregateRecord,
        items: &[ItemRecord],
    ) -> Result<(), RepositoryError> {
        self.repository.insert_aggregate(aggregate.clone()).await?;
        for item in items {
            self.repository.insert_item(item.clone()).await?;
        }
        Ok(())
    }

    /// Undo the side effects of a submission that did not complete.
    async fn abort_submission(&self, aggregate_id: &str, magic_code: Option<&str>) {
        let dir = self.workspace.aggregate_dir(aggregate_id);
        if let Err(e) = Workspace::remove_dir(&dir).await {
            warn!(path = %dir.display(), error = %e, "Failed to remove aborted submission");
        }
        if let Some(code) = magic_code {
            self.allocator.release(code).await;
        }
    }

    // -------------------------------------------------------------------------
    // Processing task
    // -------------------------------------------------------------------------

    async fn run_item(self, job: ItemJob) {
        let status = match self.process_item(&job).await {
            Ok(()) => {
                debug!(aggregate_id = %job.aggregate_id, item_id = %job.item_id, "Item ready");
                ItemStatus::Ready
            }
            Err(e) => {
                error!(
                    aggregate_id = %job.aggregate_id,
                    item_id = %job.item_id,
                    error = %e,
                    "Item processing failed"
                );
                ItemStatus::Error
            }
        };

        if let Err(e) = self.repository.set_item_status(&job.item_id, status).await {
            warn!(item_id = %job.item_id, error = %e, "Could not record item status");
        }

        if job.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish_aggregate(&job.aggregate_id).await;
        }
    }

    async fn finish_aggregate(&self, aggregate_id: &str) {
        // An item whose terminal status was not recorded keeps the aggregate
        // in processing
        match self.repository.items(aggregate_id).await {
            Ok(items) if items.iter().all(|item| item.status.is_terminal()) => {
                match self
                    .repository
                    .set_aggregate_status(aggregate_id, AggregateStatus::Ready)
                    .await
                {
                    Ok(()) => info!(aggregate_id, "Aggregate ready"),
                    Err(e) => warn!(aggregate_id, error = %e, "Could not mark aggregate ready"),
                }
            }
            Ok(items) => {
                let pending = items
                    .iter()
                    .filter(|item| !item.status.is_terminal())
                    .count();
                warn!(
                    aggregate_id,
                    pending, "Items without a recorded status, aggregate left processing"
                );
            }
            Err(e) => warn!(aggregate_id, error = %e, "Could not read items of aggregate"),
        }

        if self.store.is_some() {
            let dir = self.workspace.aggregate_dir(aggregate_id);
            if let Err(e) = Workspace::remove_dir(&dir).await {
                warn!(path = %dir.display(), error = %e, "Failed to remove aggregate directory");
            }
        }
    }

    async fn process_item(&self, job: &ItemJob) -> Result<(), ProcessingError> {
        let _permit = self.admission.acquire().await?;

        let result = self.slice_and_upload(job).await;

        if self.store.is_some() {
            let dir = self.workspace.item_dir(&job.aggregate_id, &job.item_id);
            if let Err(e) = Workspace::remove_dir(&dir).await {
                warn!(path = %dir.display(), error = %e, "Failed to remove item directory");
            }
        }

        result
    }

    async fn slice_and_upload(&self, job: &ItemJob) -> Result<(), ProcessingError> {
        let source = self.workspace.original_path(&job.aggregate_id, &job.item_id);
        let cubemap = self.workspace.cubemap_dir(&job.aggregate_id, &job.item_id);
        let slicer = self.slicer.clone();

        let output = tokio::task::spawn_blocking(move || slicer.slice(&source, &cubemap))
            .await
            .map_err(|e| ProcessingError::Join(e.to_string()))??;

        if let Some(store) = &self.store {
            self.upload_artifacts(store.as_ref(), job, &output).await?;
        }
        Ok(())
    }

    /// Upload original and faces (mandatory) then the thumbnail (tolerated).
    async fn upload_artifacts(
        &self,
        store: &dyn ObjectStore,
        job: &ItemJob,
        output: &SliceOutput,
    ) -> Result<(), StorageError> {
        let (agg, item) = (job.aggregate_id.as_str(), job.item_id.as_str());

        let original = self.workspace.original_path(agg, item);
        self.upload_one(store, &original_key(agg, item), &original)
            .await?;

        for face in CubeFace::ALL {
            self.upload_one(store, &face_key(agg, item, face), output.face_path(face))
                .await?;
        }

        if let Some(thumbnail) = &output.thumbnail {
            let key = thumbnail_key(agg, item);
            if let Err(e) = self.upload_one(store, &key, thumbnail).await {
                warn!(key = %key, error = %e, "Thumbnail upload failed");
            }
        }

        debug!(aggregate_id = agg, item_id = item, "Uploaded item artifacts");
        Ok(())
    }

    async fn upload_one(
        &self,
        store: &dyn ObjectStore,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let upload = store.upload(key, path, JPEG_CONTENT_TYPE);
        match self.upload_timeout {
            Some(limit) => tokio::time::timeout(limit, upload).await.map_err(|_| {
                StorageError::Timeout {
                    key: key.to_string(),
                    limit,
                }
            })?,
            None => upload.await,
        }
    }

    // -------------------------------------------------------------------------
    // Queries and updates
    // -------------------------------------------------------------------------

    /// Aggregate status and its items in ordinal order.
    pub async fn status(&self, aggregate_id: &str) -> Result<StatusReport, PipelineError> {
        let aggregate = self
            .repository
            .aggregate(aggregate_id)
            .await
            .map_err(not_found(aggregate_id))?;
        let items = self
            .repository
            .items(aggregate_id)
            .await
            .map_err(not_found(aggregate_id))?;

        Ok(StatusReport {
            aggregate_id: aggregate.id,
            status: aggregate.status,
            items,
        })
    }

    /// Remove an aggregate, its items, its magic code and its artifacts.
    ///
    /// Tasks still running for the aggregate finish normally; their status
    /// writes are rejected and logged.
    pub async fn delete_aggregate(
        &self,
        aggregate_id: &str,
    ) -> Result<AggregateRecord, PipelineError> {
        let record = self
            .repository
            .delete_aggregate(aggregate_id)
            .await
            .map_err(not_found(aggregate_id))?;

        if let Some(code) = &record.magic_code {
            self.allocator.release(code).await;
        }

        match &self.store {
            Some(store) => store.delete_by_prefix(&aggregate_prefix(aggregate_id)).await?,
            None => {
                let dir = self.workspace.aggregate_dir(aggregate_id);
                Workspace::remove_dir(&dir)
                    .await
                    .map_err(|e| PipelineError::LocalCleanup {
                        path: dir.display().to_string(),
                        message: e.to_string(),
                    })?;
            }
        }

        info!(aggregate_id, "Deleted aggregate");
        Ok(record)
    }

    /// Make an aggregate public, allocating a magic code if it has none.
    pub async fn publish(&self, aggregate_id: &str) -> Result<AggregateRecord, PipelineError> {
        let record = self
            .repository
            .aggregate(aggregate_id)
            .await
            .map_err(not_found(aggregate_id))?;

        let new_code = match record.magic_code {
            Some(_) => None,
            None => Some(self.allocator.allocate().await?),
        };

        match self
            .repository
            .set_visibility(aggregate_id, true, new_code.clone())
            .await
        {
            Ok(updated) => {
                // A concurrent publish assigned its code first
                if let Some(code) = &new_code {
                    if updated.magic_code.as_ref() != Some(code) {
                        debug!(aggregate_id, code = %code, "Releasing unused magic code");
                        self.allocator.release(code).await;
                    }
                }
                info!(aggregate_id, magic_code = ?updated.magic_code, "Aggregate published");
                Ok(updated)
            }
            Err(e) => {
                if let Some(code) = &new_code {
                    self.allocator.release(code).await;
                }
                Err(not_found(aggregate_id)(e))
            }
        }
    }

    /// Make an aggregate private. The magic code is kept for a later publish.
    pub async fn unpublish(&self, aggregate_id: &str) -> Result<AggregateRecord, PipelineError> {
        let updated = self
            .repository
            .set_visibility(aggregate_id, false, None)
            .await
            .map_err(not_found(aggregate_id))?;
        info!(aggregate_id, "Aggregate unpublished");
        Ok(updated)
    }

    /// Reopen a deactivated aggregate to magic-code viewers.
    pub async fn activate(&self, aggregate_id: &str) -> Result<AggregateRecord, PipelineError> {
        self.set_active(aggregate_id, true).await
    }

    /// Lock an aggregate so its magic code no longer resolves. Visibility
    /// and code are kept.
    pub async fn deactivate(&self, aggregate_id: &str) -> Result<AggregateRecord, PipelineError> {
        self.set_active(aggregate_id, false).await
    }

    async fn set_active(
        &self,
        aggregate_id: &str,
        is_active: bool,
    ) -> Result<AggregateRecord, PipelineError> {
        let updated = self
            .repository
            .set_active(aggregate_id, is_active)
            .await
            .map_err(not_found(aggregate_id))?;
        info!(aggregate_id, is_active, "Aggregate activity changed");
        Ok(updated)
    }

    /// Open a public aggregate by magic code, counting the view if the
    /// viewer is outside the cooldown window.
    pub async fn view_by_magic_code(
        &self,
        code: &str,
        viewer: &str,
    ) -> Result<PublicView, PipelineError> {
        let code = code.trim().to_ascii_uppercase();
        let record = self
            .repository
            .find_by_magic_code(&code)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => PipelineError::MagicCodeNotFound(code.clone()),
                other => other.into(),
            })?;

        let counted = self.throttle.should_count(viewer, &record.id).await;
        let aggregate = if counted {
            let views = self
                .repository
                .increment_views(&record.id)
                .await
                .map_err(not_found(&record.id))?;
            AggregateRecord { views, ..record }
        } else {
            record
        };

        let items = self
            .repository
            .items(&aggregate.id)
            .await
            .map_err(not_found(&aggregate.id))?;

        Ok(PublicView {
            aggregate,
            items,
            counted,
        })
    }
}

/// Map a repository `NotFound` to an aggregate-level not found.
fn not_found(aggregate_id: &str) -> impl Fn(RepositoryError) -> PipelineError + '_ {
    move |e| match e {
        RepositoryError::NotFound(_) => PipelineError::AggregateNotFound(aggregate_id.to_string()),
        other => other.into(),
    }
}
