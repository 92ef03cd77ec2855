//! Approval gate for mutating tools. The actual Yes/No/View prompt and the
//! "approve all" / "approve all of this type" session toggles live in the
//! out-of-scope CLI surface; this trait is the seam that surface hangs off.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

pub trait ApprovalPolicy: Send + Sync {
    /// `require_approval` lets callers route read-only tools through the
    /// same call site without ever prompting for them.
    fn decide(&self, tool: &str, require_approval: bool, description: &str) -> ApprovalDecision;
}

/// Always approves. Used by tests and by non-interactive automation.
pub struct AutoApprovePolicy;

impl ApprovalPolicy for AutoApprovePolicy {
    fn decide(&self, _tool: &str, _require_approval: bool, _description: &str) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Delegates the actual prompt to `prompt`, remembering session-wide and
/// per-tool "approve all" choices so repeat calls skip re-asking.
pub struct InteractivePolicy<F: Fn(&str, &str) -> ApprovalDecision + Send + Sync> {
    prompt: F,
    approved_tools: Mutex<HashSet<String>>,
    approve_all: AtomicBool,
}

impl<F: Fn(&str, &str) -> ApprovalDecision + Send + Sync> InteractivePolicy<F> {
    pub fn new(prompt: F) -> Self {
        Self {
            prompt,
            approved_tools: Mutex::new(HashSet::new()),
            approve_all: AtomicBool::new(false),
        }
    }

    pub fn approve_tool_for_session(&self, tool: &str) {
        self.approved_tools.lock().unwrap().insert(tool.to_string());
    }

    pub fn approve_all_for_session(&self) {
        self.approve_all.store(true, Ordering::SeqCst);
    }
}

impl<F: Fn(&str, &str) -> ApprovalDecision + Send + Sync> ApprovalPolicy for InteractivePolicy<F> {
    fn decide(&self, tool: &str, require_approval: bool, description: &str) -> ApprovalDecision {
        if !require_approval {
            return ApprovalDecision::Approve;
        }
        if self.approve_all.load(Ordering::SeqCst) {
            return ApprovalDecision::Approve;
        }
        if self.approved_tools.lock().unwrap().contains(tool) {
            return ApprovalDecision::Approve;
        }
        (self.prompt)(tool, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_approve_always_approves() {
        let policy = AutoApprovePolicy;
        assert_eq!(policy.decide("write_file", true, "x"), ApprovalDecision::Approve);
    }

    #[test]
    fn interactive_skips_prompt_once_tool_approved_for_session() {
        let policy = InteractivePolicy::new(|_, _| ApprovalDecision::Reject);
        policy.approve_tool_for_session("write_file");
        assert_eq!(policy.decide("write_file", true, "x"), ApprovalDecision::Approve);
        assert_eq!(policy.decide("delete_file", true, "x"), ApprovalDecision::Reject);
    }

    #[test]
    fn interactive_skips_prompt_for_non_approval_tools() {
        let policy = InteractivePolicy::new(|_, _| ApprovalDecision::Reject);
        assert_eq!(policy.decide("read_file", false, "x"), ApprovalDecision::Approve);
    }
}
