//! Ledger row shapes: the durable, unique-by-`step_sha` record of an
//! applied step, and the two-phase `pending -> {success, failed}` states
//! non-transactional DDL needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::WavePhase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Pending,
    Success,
    Failed,
}

/// What the caller observes about a `step_sha` before acting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerState {
    Absent,
    Pending,
    Success,
    Failed { error_summary: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerMeta {
    pub plan_id: String,
    pub wave_name: WavePhase,
    pub applied_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerOutcome {
    pub success: bool,
    pub execution_time_ms: u64,
    pub rows_affected: Option<u64>,
    /// Truncated to a bounded length by the caller before it ever reaches
    /// the ledger; see `migrate_exec::errors::bounded_summary`.
    pub error_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub step_sha: String,
    pub plan_id: String,
    pub wave_name: WavePhase,
    pub applied_at: DateTime<Utc>,
    pub applied_by: String,
    pub status: RowStatus,
    pub execution_time_ms: Option<u64>,
    pub rows_affected: Option<u64>,
    pub error_summary: Option<String>,
}

impl LedgerEntry {
    pub fn state(&self) -> LedgerState {
        match self.status {
            RowStatus::Pending => LedgerState::Pending,
            RowStatus::Success => LedgerState::Success,
            RowStatus::Failed => LedgerState::Failed { error_summary: self.error_summary.clone() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger row for {0} already exists")]
    AlreadyPresent(String),
    #[error("ledger row for {0} is absent or already terminal")]
    NotPending(String),
}
