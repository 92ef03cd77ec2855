//! SSE consumer for the remote reasoning service. Splits the original
//! three-way concern into separate modules: `client` owns the event loop and
//! the HTTP surface, `dispatch` routes tool calls to the local executor and
//! posts results back, `change` applies file-change directives.

pub mod change;
pub mod client;
pub mod dispatch;
pub mod errors;

pub use client::{
    ChangeDirective, ChangeKind, EventStream, OpenedStream, RunOptions, RunOutcome, StreamClient, StreamEvent,
    ToolCallPayload, is_terminal,
};
pub use errors::{Error, Result};
