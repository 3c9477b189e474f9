//! Reference adapters for the ports.
//!
//! - **InMemoryCache**, **FileCache**: [`DurableCache`](crate::ports::DurableCache) implementations
//! - **InMemoryBackingStore**: a [`BackingStore`](crate::ports::BackingStore) for demos and tests

pub mod file_cache;
pub mod memory_cache;
pub mod memory_store;

pub use self::file_cache::FileCache;
pub use self::memory_cache::InMemoryCache;
pub use self::memory_store::InMemoryBackingStore;
