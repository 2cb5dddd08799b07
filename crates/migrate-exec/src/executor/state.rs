//! Plan-level state machine and the result the executor hands back.
//!
//! ```text
//! ANNOTATED ──acquire_lock──► RUNNING ──(all waves ok)──► COMPLETED
//!                               │──(fatal error)─────────► FAILED
//!                               │──(external abort)──────► ABORTED
//!                               │──(governor abort)──────► ABORTED
//! ```
//! Terminal states are monotonic: once reached, no further transition
//! occurs. `LockUnavailable` is not a plan state — it means the plan never
//! left `ANNOTATED`, so it is surfaced as an `Err` from `execute` instead.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    Annotated,
    Running,
    Completed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    pub step_sha: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub terminal_state: PlanState,
    pub waves_completed: usize,
    pub steps_applied: usize,
    pub steps_skipped: usize,
    pub steps_failed: usize,
    pub first_failure: Option<FailureDetail>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self {
            terminal_state: PlanState::Running,
            waves_completed: 0,
            steps_applied: 0,
            steps_skipped: 0,
            steps_failed: 0,
            first_failure: None,
        }
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}
