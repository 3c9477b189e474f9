//! Ports: the seams to everything outside the queue.
//!
//! Each trait hides an external collaborator so the queue can be exercised
//! against in-memory doubles:
//! - the backing store is the source of truth for committed entities
//! - the durable cache keeps the queue itself across restarts
//! - clock and id generation are injected for deterministic tests

pub mod backing_store;
pub mod cache;
pub mod clock;
pub mod id_generator;

pub use self::backing_store::BackingStore;
pub use self::cache::DurableCache;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
