//! View counting throttle.
//!
//! A view of an aggregate is counted at most once per viewer per cooldown
//! window. Entries live in a bounded LRU; evicting an entry early can at
//! worst let one extra view through.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

/// Default window between two counted views of the same viewer.
pub const DEFAULT_VIEW_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of tracked (viewer, aggregate) pairs.
pub const DEFAULT_VIEW_CACHE_CAPACITY: usize = 10_000;

// =============================================================================
// Key
// =============================================================================

/// Identifies one viewer looking at one aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Client identity, usually the remote address
    pub viewer: String,

    /// Aggregate being viewed
    pub aggregate_id: String,
}

impl ViewKey {
    pub fn new(viewer: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        Self {
            viewer: viewer.into(),
            aggregate_id: aggregate_id.into(),
        }
    }
}

// =============================================================================
// Throttle
// =============================================================================

/// Decides whether a view should increment the aggregate's counter.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use panocube::access::ViewThrottle;
///
/// #[tokio::main]
/// async fn main() {
///     let throttle = ViewThrottle::new();
///     let now = Instant::now();
///
///     assert!(throttle.should_count_at("10.0.0.1", "tour", now).await);
///     assert!(!throttle.should_count_at("10.0.0.1", "tour", now).await);
///     assert!(throttle
///         .should_count_at("10.0.0.1", "tour", now + Duration::from_secs(300))
///         .await);
/// }
/// ```
pub struct ViewThrottle {
    entries: Mutex<LruCache<ViewKey, Instant>>,
    cooldown: Duration,
}

impl ViewThrottle {
    /// Throttle with a 5 minute cooldown and 10 000 entries.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_VIEW_COOLDOWN, DEFAULT_VIEW_CACHE_CAPACITY)
    }

    /// Throttle with a custom cooldown and capacity (minimum 1 entry).
    pub fn with_settings(cooldown: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether a view by `viewer` of `aggregate_id` counts right now.
    pub async fn should_count(&self, viewer: &str, aggregate_id: &str) -> bool {
        self.should_count_at(viewer, aggregate_id, Instant::now())
            .await
    }

    /// Same as [`should_count`](Self::should_count) at an explicit instant.
    ///
    /// Records `now` whenever the view counts.
    pub async fn should_count_at(&self, viewer: &str, aggregate_id: &str, now: Instant) -> bool {
        let key = ViewKey::new(viewer, aggregate_id);
        let mut entries = self.entries.lock().await;

        let counts = match entries.peek(&key) {
            Some(last) => now.saturating_duration_since(*last) >= self.cooldown,
            None => true,
        };

        if counts {
            entries.put(key, now);
        }
        counts
    }

    /// Number of tracked pairs.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for ViewThrottle {
    fn default() -> Self {
        Self::new()
    }
}
