//! Status persistence.
//!
//! The orchestrator is the only writer. The repository enforces the state
//! machines so a buggy caller cannot move a record backwards:
//!
//! ```text
//! item:       processing ──► ready
//!                        └─► error
//! aggregate:  processing ──► ready
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::status::{AggregateRecord, AggregateStatus, ItemRecord, ItemStatus};
use crate::error::RepositoryError;

/// Storage of aggregate and item records.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Persist a new aggregate.
    async fn insert_aggregate(&self, record: AggregateRecord) -> Result<(), RepositoryError>;

    /// Persist a new item. Its aggregate must exist.
    async fn insert_item(&self, record: ItemRecord) -> Result<(), RepositoryError>;

    /// Fetch one aggregate.
    async fn aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError>;

    /// All items of an aggregate, ordered by ordinal.
    async fn items(&self, aggregate_id: &str) -> Result<Vec<ItemRecord>, RepositoryError>;

    /// Move an item from `processing` to a terminal status.
    async fn set_item_status(&self, id: &str, status: ItemStatus) -> Result<(), RepositoryError>;

    /// Move an aggregate from `processing` to `ready`.
    async fn set_aggregate_status(
        &self,
        id: &str,
        status: AggregateStatus,
    ) -> Result<(), RepositoryError>;

    /// Update the public flag. `magic_code` is assigned only if the
    /// aggregate has none yet; the returned record carries the code that won.
    async fn set_visibility(
        &self,
        id: &str,
        is_public: bool,
        magic_code: Option<String>,
    ) -> Result<AggregateRecord, RepositoryError>;

    /// Activate or deactivate an aggregate.
    async fn set_active(
        &self,
        id: &str,
        is_active: bool,
    ) -> Result<AggregateRecord, RepositoryError>;

    /// Public and active aggregate owning `code`.
    async fn find_by_magic_code(&self, code: &str) -> Result<AggregateRecord, RepositoryError>;

    /// Add one view. Returns the new count.
    async fn increment_views(&self, id: &str) -> Result<u64, RepositoryError>;

    /// Remove an aggregate and its items. Returns the removed record.
    async fn delete_aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
struct Tables {
    aggregates: HashMap<String, AggregateRecord>,
    items: HashMap<String, ItemRecord>,
}

/// [`StatusRepository`] held in process memory.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored aggregates.
    pub async fn aggregate_count(&self) -> usize {
        self.tables.read().await.aggregates.len()
    }

    /// Number of stored items.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.len()
    }
}

#[async_trait]
impl StatusRepository for MemoryRepository {
    async fn insert_aggregate(&self, record: AggregateRecord) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.aggregates.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate(record.id));
        }
        tables.aggregates.insert(record.id.clone(), record);
        Ok(())
    }

    async fn insert_item(&self, record: ItemRecord) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.aggregates.contains_key(&record.aggregate_id) {
            return Err(RepositoryError::NotFound(record.aggregate_id));
        }
        if tables.items.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate(record.id));
        }
        tables.items.insert(record.id.clone(), record);
        Ok(())
    }

    async fn aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError> {
        self.tables
            .read()
            .await
            .aggregates
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn items(&self, aggregate_id: &str) -> Result<Vec<ItemRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        if !tables.aggregates.contains_key(aggregate_id) {
            return Err(RepositoryError::NotFound(aggregate_id.to_string()));
        }

        let mut items: Vec<ItemRecord> = tables
            .items
            .values()
            .filter(|item| item.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.ordinal);
        Ok(items)
    }

    async fn set_item_status(&self, id: &str, status: ItemStatus) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if item.status.is_terminal() || !status.is_terminal() {
            return Err(RepositoryError::InvalidTransition {
                id: id.to_string(),
                from: item.status.as_str(),
                to: status.as_str(),
            });
        }
        item.status = status;
        Ok(())
    }

    async fn set_aggregate_status(
        &self,
        id: &str,
        status: AggregateStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let aggregate = tables
            .aggregates
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if aggregate.status != AggregateStatus::Processing || status != AggregateStatus::Ready {
            return Err(RepositoryError::InvalidTransition {
                id: id.to_string(),
                from: aggregate.status.as_str(),
                to: status.as_str(),
            });
        }
        aggregate.status = status;
        Ok(())
    }

    async fn set_visibility(
        &self,
        id: &str,
        is_public: bool,
        magic_code: Option<String>,
    ) -> Result<AggregateRecord, RepositoryError> {
        let mut tables = self.tables.write().await;
        let aggregate = tables
            .aggregates
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        aggregate.is_public = is_public;
        if aggregate.magic_code.is_none() {
            aggregate.magic_code = magic_code;
        }
        Ok(aggregate.clone())
    }

    async fn set_active(
        &self,
        id: &str,
        is_active: bool,
    ) -> Result<AggregateRecord, RepositoryError> {
        let mut tables = self.tables.write().await;
        let aggregate = tables
            .aggregates
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        aggregate.is_active = is_active;
        Ok(aggregate.clone())
    }

    async fn find_by_magic_code(&self, code: &str) -> Result<AggregateRecord, RepositoryError> {
        self.tables
            .read()
            .await
            .aggregates
            .values()
            .find(|agg| {
                agg.is_public && agg.is_active && agg.magic_code.as_deref() == Some(code)
            })
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(code.to_string()))
    }

    async fn increment_views(&self, id: &str) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let aggregate = tables
            .aggregates
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        aggregate.views += 1;
        Ok(aggregate.views)
    }

    async fn delete_aggregate(&self, id: &str) -> Result<AggregateRecord, RepositoryError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .aggregates
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        tables.items.retain(|_, item| item.aggregate_id != id);
        Ok(removed)
    }
}
