//! Status records and reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one item. `Ready` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Processing,
    Ready,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Processing => "processing",
            ItemStatus::Ready => "ready",
            ItemStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Processing)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an aggregate. Becomes `Ready` once every item is terminal,
/// even if some of them failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Processing,
    Ready,
}

impl AggregateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateStatus::Processing => "processing",
            AggregateStatus::Ready => "ready",
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tour: one submission of one or more panoramas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub status: AggregateStatus,

    /// Sum of the uploaded source sizes in bytes
    pub size: u64,

    pub is_public: bool,

    /// Deactivated aggregates cannot be opened by magic code even when public
    #[serde(default = "default_active")]
    pub is_active: bool,

    pub magic_code: Option<String>,
    pub views: u64,

    /// Working path of the first item
    pub primary_path: Option<String>,

    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// A scene: one panorama inside an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub aggregate_id: String,

    /// Display name, `"Scene {n}"` with n starting at 1
    pub name: String,

    /// Local working directory of the item
    pub local_path: String,

    pub status: ItemStatus,

    /// Position within the aggregate, 0-based
    pub ordinal: usize,

    /// Source size in bytes
    pub size: u64,
}

/// Current state of an aggregate and all of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub aggregate_id: String,
    pub status: AggregateStatus,

    /// Items in ordinal order
    pub items: Vec<ItemRecord>,
}

/// What an anonymous viewer gets for a magic code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicView {
    pub aggregate: AggregateRecord,
    pub items: Vec<ItemRecord>,

    /// Whether this request incremented the view counter
    pub counted: bool,
}
