//! Queue module: durable store, conflict check, executor, retry policy and
//! the manager tying them together.

mod conflict;
mod drain_loop;
mod executor;
mod manager;
mod retry;
mod status;
mod store;

pub(crate) use manager::ManagerParts;

pub use conflict::{ConflictChecker, first_conflict};
pub use drain_loop::DrainLoop;
pub use executor::OperationExecutor;
pub use manager::QueueManager;
pub use retry::RetryPolicy;
pub use status::{DrainSummary, QueueStatus, SkipReason};
pub use store::{DEFAULT_STORAGE_KEY, QueueStore};
