//! The durable per-task record: progress cursors, retry accounting, timing,
//! and continuity fields carried from one run into a follow-up instruction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub job_id: String,
    pub instruction: String,
    pub status: ExecutionStatus,

    #[serde(default)]
    pub current_milestone: usize,
    #[serde(default)]
    pub current_phase: usize,
    #[serde(default)]
    pub current_task_index: usize,

    #[serde(default)]
    pub completed_milestones: Vec<usize>,
    #[serde(default)]
    pub completed_phases: Vec<usize>,
    #[serde(default)]
    pub completed_tasks: Vec<usize>,

    /// Keyed by `"<milestone_idx>:<phase_idx>:<task_idx>"`.
    #[serde(default)]
    pub retry_counts: HashMap<String, u32>,

    #[serde(default)]
    pub milestone_results: HashMap<String, Value>,
    #[serde(default)]
    pub phase_results: HashMap<String, Value>,
    #[serde(default)]
    pub task_results: HashMap<String, Value>,

    pub started_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checkpoint_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,

    /// Opaque — the engine does not interpret the shape of a PRD or
    /// milestone plan, only stores and forwards it.
    #[serde(default)]
    pub prd: Option<Value>,
    #[serde(default)]
    pub milestones: Option<Value>,

    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub error_count: u32,

    #[serde(default)]
    pub project_context: Option<Value>,
    #[serde(default)]
    pub last_explorer_summary: Option<String>,
    #[serde(default)]
    pub active_files: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub last_instruction_result: Option<Value>,
}

impl ExecutionState {
    pub fn new(job_id: impl Into<String>, instruction: impl Into<String>, max_duration_secs: i64) -> Self {
        let started_at = Utc::now();
        Self {
            job_id: job_id.into(),
            instruction: instruction.into(),
            status: ExecutionStatus::Pending,
            current_milestone: 0,
            current_phase: 0,
            current_task_index: 0,
            completed_milestones: Vec::new(),
            completed_phases: Vec::new(),
            completed_tasks: Vec::new(),
            retry_counts: HashMap::new(),
            milestone_results: HashMap::new(),
            phase_results: HashMap::new(),
            task_results: HashMap::new(),
            started_at,
            deadline_at: started_at + chrono::Duration::seconds(max_duration_secs),
            last_checkpoint_at: None,
            last_activity_at: None,
            prd: None,
            milestones: None,
            last_error: None,
            error_count: 0,
            project_context: None,
            last_explorer_summary: None,
            active_files: Vec::new(),
            tech_stack: Vec::new(),
            last_instruction_result: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.deadline_at
    }

    pub fn can_resume(&self) -> bool {
        matches!(self.status, ExecutionStatus::Running | ExecutionStatus::Paused)
    }

    pub fn increment_retry(&mut self, key: &str) -> u32 {
        let count = self.retry_counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get_retry_count(&self, key: &str) -> u32 {
        self.retry_counts.get(key).copied().unwrap_or(0)
    }

    pub fn get_progress_summary(&self) -> String {
        format!(
            "milestone {} (phase {}, task {}), {} milestones / {} phases / {} tasks completed",
            self.current_milestone,
            self.current_phase,
            self.current_task_index,
            self.completed_milestones.len(),
            self.completed_phases.len(),
            self.completed_tasks.len(),
        )
    }

    /// A human-readable summary composed from tech stack, a truncated active
    /// file list, the last explorer summary, and the last instruction result
    /// — used to prime a follow-up instruction after a pause/resume.
    pub fn get_continuity_context(&self, max_chars: usize) -> String {
        let mut parts = Vec::new();

        if !self.tech_stack.is_empty() {
            parts.push(format!("Tech stack: {}", self.tech_stack.join(", ")));
        }

        if !self.active_files.is_empty() {
            const SHOWN: usize = 10;
            if self.active_files.len() > SHOWN {
                let shown: Vec<_> = self.active_files.iter().take(SHOWN).cloned().collect();
                parts.push(format!(
                    "Active files: {} (+{} more)",
                    shown.join(", "),
                    self.active_files.len() - SHOWN
                ));
            } else {
                parts.push(format!("Active files: {}", self.active_files.join(", ")));
            }
        }

        if let Some(summary) = &self.last_explorer_summary {
            parts.push(format!("Last exploration: {summary}"));
        }

        if let Some(result) = &self.last_instruction_result {
            parts.push(format!("Last result: {result}"));
        }

        let joined = parts.join("\n");
        if joined.chars().count() > max_chars {
            joined.chars().take(max_chars).collect()
        } else {
            joined
        }
    }

    /// Writer side of the continuity fields: folds a tool/instruction result
    /// into `active_files`, `tech_stack`, `last_explorer_summary`, and
    /// `last_error`/`error_count`.
    pub fn update_from_result(&mut self, result: &Value) {
        self.last_instruction_result = Some(result.clone());
        self.last_activity_at = Some(Utc::now());

        if let Some(files) = result.get("active_files").and_then(Value::as_array) {
            self.active_files = files.iter().filter_map(|f| f.as_str().map(String::from)).collect();
        }
        if let Some(stack) = result.get("tech_stack").and_then(Value::as_array) {
            self.tech_stack = stack.iter().filter_map(|f| f.as_str().map(String::from)).collect();
        }
        if let Some(summary) = result.get("explorer_summary").and_then(Value::as_str) {
            self.last_explorer_summary = Some(summary.to_string());
        }
        if let Some(error) = result.get("error").and_then(Value::as_str) {
            self.last_error = Some(error.to_string());
            self.error_count += 1;
        }
    }
}
