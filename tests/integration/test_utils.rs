//! Test utilities for integration tests.
//!
//! Mock object store with failure injection, a repository wrapper that
//! counts aggregate transitions, and synthetic panorama builders.

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgb, RgbImage};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use panocube::access::{CodeRegistry, MemoryCodeRegistry};
use panocube::error::{RepositoryError, StorageError};
use panocube::pipeline::{
    AdmissionPool, AggregateRecord, AggregateStatus, ItemRecord, ItemStatus, MemoryRepository,
    Orchestrator, SourceUpload, StatusRepository, SubmitRequest, Workspace,
};
use panocube::slicer::Slicer;
use panocube::storage::ObjectStore;

// =============================================================================
// Mock Object Store
// =============================================================================

/// In-memory object store that records every call.
///
/// Uploads read the local file so a test can tell that the artifact existed
/// when it was uploaded.
#[derive(Default)]
pub struct MockObjectStore {
    objects: RwLock<HashMap<String, Bytes>>,
    content_types: RwLock<HashMap<String, String>>,
    failing: RwLock<Vec<String>>,
    hanging: RwLock<Vec<String>>,
    prefix_deletes: RwLock<Vec<String>>,
    deleted_keys: RwLock<Vec<String>>,
    delay_ms: Option<(u64, u64)>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    upload_count: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep a random duration in `[min_ms, max_ms]` on every upload.
    pub fn with_random_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay_ms = Some((min_ms, max_ms));
        self
    }

    /// Fail every upload whose key ends with `suffix`.
    pub async fn fail_uploads_ending_with(&self, suffix: &str) {
        self.failing.write().await.push(suffix.to_string());
    }

    /// Never complete uploads whose key ends with `suffix`.
    pub async fn hang_uploads_ending_with(&self, suffix: &str) {
        self.hanging.write().await.push(suffix.to_string());
    }

    pub async fn keys(&self) -> HashSet<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.content_types.read().await.get(key).cloned()
    }

    pub async fn prefix_deletes(&self) -> Vec<String> {
        self.prefix_deletes.read().await.clone()
    }

    pub async fn deleted_keys(&self) -> Vec<String> {
        self.deleted_keys.read().await.clone()
    }

    /// Highest number of uploads observed in flight at once.
    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.upload_count.load(Ordering::SeqCst)
    }

    async fn matches(list: &RwLock<Vec<String>>, key: &str) -> bool {
        list.read()
            .await
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()))
    }

    fn random_delay(&self) -> Option<Duration> {
        self.delay_ms.map(|(min, max)| {
            let ms = rand::thread_rng().gen_range(min..=max);
            Duration::from_millis(ms)
        })
    }
}

/// Decrements the active counter when an upload ends, however it ends.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.upload_count.fetch_add(1, Ordering::SeqCst);
        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(current, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        if let Some(delay) = self.random_delay() {
            tokio::time::sleep(delay).await;
        }

        if Self::matches(&self.hanging, key).await {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        if Self::matches(&self.failing, key).await {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::LocalFile {
                path: local_path.display().to_string(),
                message: e.to_string(),
            })?;

        self.objects
            .write()
            .await
            .insert(key.to_string(), Bytes::from(data));
        self.content_types
            .write()
            .await
            .insert(key.to_string(), content_type.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        self.deleted_keys.write().await.push(key.to_string());
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        self.prefix_deletes.write().await.push(prefix.to_string());

        let mut objects = self.objects.write().await;
        let matching: Vec<String> = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            objects.remove(key);
        }
        self.deleted_keys.write().await.extend(matching);
        Ok(())
    }
}

// =============================================================================
// Counting Repository
// =============================================================================

/// [`MemoryRepository`] wrapper counting successful aggregate transitions,
/// with optional random latency and injected failures on status writes.
#[derive(Default)]
pub struct CountingRepository {
    inner: MemoryRepository,
    aggregate_transitions: AtomicUsize,
    item_transitions: AtomicUsize,
    delay_ms: Option<(u64, u64)>,
    failing_item_writes: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay_ms = Some((min_ms, max_ms));
        self
    }

    /// Reject the next `count` item status writes with a backend error.
    pub fn with_failing_item_writes(self, count: usize) -> Self {
        self.failing_item_writes.store(count, Ordering::SeqCst);
        self
    }

    pub fn aggregate_transitions(&self) -> usize {
        self.aggregate_transitions.load(Ordering::SeqCst)
    }

    pub fn item_transitions(&self) -> usize {
        self.item_transitions.load(Ordering::SeqCst)
    }

    async fn jitter(&self) {
        if let Some((min, max)) = self.delay_ms {
            let ms = rand::thread_rng().gen_range(min..=max);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl StatusRepository for CountingRepository {
    async fn insert_aggregate(&self, record: AggregateRecord) -> Result<(), RepositoryError> {
        self.inner.insert_aggregate(record).await
    }

    async fn insert_item(&self, record: ItemRecord) -> Result<(), RepositoryError> {
        self.inner.insert_item(record).await
    }

    async fn aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError> {
        self.inner.aggregate(id).await
    }

    async fn items(&self, aggregate_id: &str) -> Result<Vec<ItemRecord>, RepositoryError> {
        self.inner.items(aggregate_id).await
    }

    async fn set_item_status(&self, id: &str, status: ItemStatus) -> Result<(), RepositoryError> {
        self.jitter().await;
        let injected = self
            .failing_item_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(RepositoryError::Backend("injected failure".to_string()));
        }
        self.inner.set_item_status(id, status).await?;
        self.item_transitions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_aggregate_status(
        &self,
        id: &str,
        status: AggregateStatus,
    ) -> Result<(), RepositoryError> {
        self.jitter().await;
        self.inner.set_aggregate_status(id, status).await?;
        self.aggregate_transitions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_visibility(
        &self,
        id: &str,
        is_public: bool,
        magic_code: Option<String>,
    ) -> Result<AggregateRecord, RepositoryError> {
        self.inner.set_visibility(id, is_public, magic_code).await
    }

    async fn set_active(
        &self,
        id: &str,
        is_active: bool,
    ) -> Result<AggregateRecord, RepositoryError> {
        self.inner.set_active(id, is_active).await
    }

    async fn find_by_magic_code(&self, code: &str) -> Result<AggregateRecord, RepositoryError> {
        self.inner.find_by_magic_code(code).await
    }

    async fn increment_views(&self, id: &str) -> Result<u64, RepositoryError> {
        self.inner.increment_views(id).await
    }

    async fn delete_aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError> {
        self.inner.delete_aggregate(id).await
    }
}

// =============================================================================
// Slow Code Registry
// =============================================================================

/// [`MemoryCodeRegistry`] whose reservations take `delay` to complete.
pub struct SlowCodeRegistry {
    inner: MemoryCodeRegistry,
    delay: Duration,
}

impl SlowCodeRegistry {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCodeRegistry::new(),
            delay,
        }
    }
}

#[async_trait]
impl CodeRegistry for SlowCodeRegistry {
    async fn reserve(&self, code: &str) -> bool {
        tokio::time::sleep(self.delay).await;
        self.inner.reserve(code).await
    }

    async fn release(&self, code: &str) {
        self.inner.release(code).await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Encode a synthetic 2:1 panorama as JPEG.
pub fn panorama_jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            160,
        ])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("encode panorama");
    Bytes::from(buf)
}

/// A small valid panorama upload.
pub fn good_upload(name: &str) -> SourceUpload {
    SourceUpload::new(name, panorama_jpeg(64, 32))
}

/// An upload that cannot be decoded.
pub fn garbage_upload(name: &str) -> SourceUpload {
    SourceUpload::new(name, Bytes::from_static(b"this is not an image at all"))
}

pub fn submit_request(uploads: Vec<SourceUpload>, is_public: bool) -> SubmitRequest {
    SubmitRequest {
        owner_id: "owner-1".to_string(),
        name: "Test tour".to_string(),
        is_public,
        uploads,
    }
}

/// Orchestrator over `repository` with a small thumbnail for speed.
pub fn orchestrator(
    root: &Path,
    repository: Arc<dyn StatusRepository>,
    concurrency: usize,
) -> Orchestrator {
    Orchestrator::new(
        repository,
        Arc::new(AdmissionPool::new(concurrency)),
        Workspace::new(root),
    )
    .with_slicer(Slicer::new().with_thumbnail_size(16))
}
