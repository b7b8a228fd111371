//! Short public access codes.
//!
//! A magic code is a random string over `A-Z0-9` that lets anonymous viewers
//! open a public aggregate. Uniqueness is enforced by reserving each candidate
//! in a [`CodeRegistry`]; a collision simply draws another candidate.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AllocationError;

/// Characters a code is drawn from.
pub const MAGIC_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default code length.
pub const DEFAULT_MAGIC_CODE_LENGTH: usize = 4;

/// Longest supported code length.
pub const MAX_MAGIC_CODE_LENGTH: usize = 16;

// =============================================================================
// Registry
// =============================================================================

/// Set of codes currently in use.
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    /// Atomically claim `code`. Returns `false` if it is already taken.
    async fn reserve(&self, code: &str) -> bool;

    /// Return `code` to the pool.
    async fn release(&self, code: &str);

    /// Number of codes currently reserved.
    async fn len(&self) -> usize;
}

/// In-process registry backed by a `HashSet`.
#[derive(Debug, Default)]
pub struct MemoryCodeRegistry {
    codes: Mutex<HashSet<String>>,
}

impl MemoryCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeRegistry for MemoryCodeRegistry {
    async fn reserve(&self, code: &str) -> bool {
        self.codes.lock().await.insert(code.to_string())
    }

    async fn release(&self, code: &str) {
        self.codes.lock().await.remove(code);
    }

    async fn len(&self) -> usize {
        self.codes.lock().await.len()
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Allocates collision-free magic codes.
pub struct MagicCodeAllocator {
    registry: Arc<dyn CodeRegistry>,
    length: usize,
}

impl MagicCodeAllocator {
    /// Create an allocator of `length`-character codes over `registry`.
    pub fn new(registry: Arc<dyn CodeRegistry>, length: usize) -> Self {
        Self {
            registry,
            length: length.clamp(1, MAX_MAGIC_CODE_LENGTH),
        }
    }

    /// Allocator with an in-memory registry and the default length.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCodeRegistry::new()),
            DEFAULT_MAGIC_CODE_LENGTH,
        )
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Total number of distinct codes of the configured length.
    pub fn codespace(&self) -> u128 {
        (MAGIC_CODE_ALPHABET.len() as u128).saturating_pow(self.length as u32)
    }

    /// Draw and reserve a fresh code.
    ///
    /// Retries on collision without a bound, but fails with
    /// [`AllocationError::Exhausted`] once every code is taken.
    pub async fn allocate(&self) -> Result<String, AllocationError> {
        let codespace = self.codespace();
        let mut attempts = 0u32;

        loop {
            if self.registry.len().await as u128 >= codespace {
                return Err(AllocationError::Exhausted {
                    length: self.length,
                    codespace,
                });
            }

            let candidate = generate_code(self.length);
            attempts += 1;
            if self.registry.reserve(&candidate).await {
                if attempts > 1 {
                    debug!(attempts, "Magic code allocated after collisions");
                }
                return Ok(candidate);
            }
        }
    }

    /// Make `code` available again.
    pub async fn release(&self, code: &str) {
        self.registry.release(code).await;
    }
}

/// Random code of `length` characters from [`MAGIC_CODE_ALPHABET`].
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| MAGIC_CODE_ALPHABET[rng.gen_range(0..MAGIC_CODE_ALPHABET.len())] as char)
        .collect()
}
