//! App - configuration and wiring of the queue manager
//!
//! - **config**: `QueueConfig` (TOML-loadable, validated up front)
//! - **builder**: `QueueManagerBuilder` (fail-fast construction)

pub mod builder;
pub mod config;

pub use self::builder::QueueManagerBuilder;
pub use self::config::QueueConfig;
