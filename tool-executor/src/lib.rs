//! Sandboxed local tool surface for the streaming task runtime: file
//! inspection/editing, code search, and shell execution, all confined to a
//! project root and gated by an approval policy for mutating calls.

pub mod approval;
pub mod errors;
pub mod sandbox;
pub mod tools;

pub use approval::{ApprovalDecision, ApprovalPolicy, AutoApprovePolicy, InteractivePolicy};
pub use errors::{Error, Result};
pub use tools::{
    DeleteFileResult, EditFileResult, GetFileInfoResult, ListFilesResult, ReadFileResult, SearchFilesResult,
    SearchMatch, ShellResult, ToolExecutor, WriteFileResult, MUTATING_TOOLS,
};
