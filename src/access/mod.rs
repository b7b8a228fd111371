//! Public access: magic codes and view counting.

mod magic_code;
mod throttle;

pub use magic_code::{
    generate_code, CodeRegistry, MagicCodeAllocator, MemoryCodeRegistry,
    DEFAULT_MAGIC_CODE_LENGTH, MAGIC_CODE_ALPHABET, MAX_MAGIC_CODE_LENGTH,
};
pub use throttle::{ViewKey, ViewThrottle, DEFAULT_VIEW_CACHE_CAPACITY, DEFAULT_VIEW_COOLDOWN};
