//! Durable per-project task execution state, with checkpointing, retry
//! accounting, and cross-run continuity context.

pub mod errors;
pub mod manager;
pub mod state;

pub use errors::{Error, Result};
pub use manager::{DEFAULT_CHECKPOINT_INTERVAL_SECS, DEFAULT_MAX_DURATION_SECS, ExecutionStateManager};
pub use state::{ExecutionState, ExecutionStatus};
