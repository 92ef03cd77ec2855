//! Loads/saves the single per-project `state.json` document and applies the
//! checkpoint-interval and max-duration policy around it.

use crate::errors::{Error, Result};
use crate::state::{ExecutionState, ExecutionStatus};
use chrono::Utc;
use serde_json::{Value, json};
use std::path::PathBuf;

pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: i64 = 300;
pub const DEFAULT_MAX_DURATION_SECS: i64 = 3600;

pub struct ExecutionStateManager {
    path: PathBuf,
    checkpoint_interval_secs: i64,
    max_duration_secs: i64,
}

impl ExecutionStateManager {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_intervals(project_root, DEFAULT_CHECKPOINT_INTERVAL_SECS, DEFAULT_MAX_DURATION_SECS)
    }

    pub fn with_intervals(project_root: impl Into<PathBuf>, checkpoint_interval_secs: i64, max_duration_secs: i64) -> Self {
        Self {
            path: project_root.into().join(".tarang").join("state.json"),
            checkpoint_interval_secs,
            max_duration_secs,
        }
    }

    pub fn create_state(&self, job_id: impl Into<String>, instruction: impl Into<String>) -> ExecutionState {
        ExecutionState::new(job_id, instruction, self.max_duration_secs)
    }

    /// Updates checkpoint/activity timestamps and writes the document.
    /// A write failure is logged and swallowed rather than propagated —
    /// checkpointing is best-effort and must never fail the task over it.
    pub fn save(&self, state: &mut ExecutionState) -> Result<()> {
        let now = Utc::now();
        state.last_checkpoint_at = Some(now);
        state.last_activity_at = Some(now);
        if let Err(err) = self.write_checkpoint(state) {
            tracing::warn!(job_id = %state.job_id, error = %err, "checkpoint write failed, continuing without persisting");
        }
        Ok(())
    }

    fn write_checkpoint(&self, state: &ExecutionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Tolerant of unknown fields (forward-compat): unrecognized keys in the
    /// document are simply ignored by `serde_json`'s default struct deserialization.
    pub fn load(&self) -> Result<ExecutionState> {
        if !self.path.is_file() {
            return Err(Error::NotFound);
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn should_checkpoint(&self, state: &ExecutionState) -> bool {
        match state.last_checkpoint_at {
            None => true,
            Some(last) => (Utc::now() - last).num_seconds() >= self.checkpoint_interval_secs,
        }
    }

    pub fn mark_completed(&self, state: &mut ExecutionState) {
        state.status = ExecutionStatus::Completed;
        state.last_activity_at = Some(Utc::now());
    }

    pub fn mark_failed(&self, state: &mut ExecutionState, error: impl Into<String>) {
        state.status = ExecutionStatus::Failed;
        state.last_error = Some(error.into());
        state.error_count += 1;
        state.last_activity_at = Some(Utc::now());
    }

    pub fn mark_paused(&self, state: &mut ExecutionState) {
        state.status = ExecutionStatus::Paused;
        state.last_activity_at = Some(Utc::now());
    }

    pub fn can_resume(&self, state: &ExecutionState) -> bool {
        state.can_resume()
    }

    pub fn get_resume_info(&self, state: &ExecutionState) -> Option<Value> {
        if !state.can_resume() {
            return None;
        }
        Some(json!({
            "job_id": state.job_id,
            "instruction": state.instruction,
            "continuity_context": state.get_continuity_context(2000),
            "current_milestone": state.current_milestone,
            "current_phase": state.current_phase,
            "current_task_index": state.current_task_index,
        }))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.is_file() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExecutionStateManager::new(dir.path());
        let mut state = manager.create_state("job-1", "refactor the parser");
        manager.save(&mut state).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.job_id, "job-1");
        assert!(loaded.last_checkpoint_at.is_some());
    }

    #[test]
    fn should_checkpoint_true_before_first_save() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExecutionStateManager::new(dir.path());
        let state = manager.create_state("job-1", "x");
        assert!(manager.should_checkpoint(&state));
    }

    #[test]
    fn resume_info_absent_unless_running_or_paused() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExecutionStateManager::new(dir.path());
        let mut state = manager.create_state("job-1", "x");
        assert!(manager.get_resume_info(&state).is_none());

        manager.mark_paused(&mut state);
        assert!(manager.get_resume_info(&state).is_some());
    }

    #[test]
    fn save_swallows_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // Make the state path's parent a file, not a directory, so the
        // checkpoint write can never succeed.
        let blocker = dir.path().join("state-parent");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let manager = ExecutionStateManager::new(&blocker);
        let mut state = manager.create_state("job-1", "x");

        assert!(manager.save(&mut state).is_ok());
        assert!(state.last_checkpoint_at.is_some());
    }

    #[test]
    fn clear_removes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExecutionStateManager::new(dir.path());
        let mut state = manager.create_state("job-1", "x");
        manager.save(&mut state).unwrap();
        manager.clear().unwrap();
        assert!(matches!(manager.load(), Err(Error::NotFound)));
    }
}
