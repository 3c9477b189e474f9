//! tidequeue-core
//!
//! Offline operation queue with conflict-aware replay.
//!
//! Client-side mutations are recorded while the backing store is unreachable,
//! persisted to a durable local cache, and replayed in enqueue order once
//! connectivity returns. Operations that claim a resource are checked for
//! conflicts before they are replayed; transient failures are retried with
//! linear backoff up to a bound.
//!
//! # Modules
//! - **domain**: data model (ids, kinds, records, resource claims, errors)
//! - **ports**: seams to the outside (BackingStore, DurableCache, Clock, IdGenerator)
//! - **queue**: durable store, conflict checker, executor, manager, drain loop
//! - **app**: configuration and the manager builder
//! - **impls**: in-memory and file-backed adapters

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{QueueConfig, QueueManagerBuilder};
pub use domain::{OperationId, OperationKind, OperationRecord, OperationStatus};
pub use queue::{DrainLoop, DrainSummary, QueueManager, QueueStatus, RetryPolicy};
