//! The executor's error taxonomy. These are kinds, not opaque strings — the
//! event log and the ledger's `error_summary` both render from this enum so
//! a `step.fail` event and its ledger row always agree on what happened.

use thiserror::Error;

const MAX_SUMMARY_LEN: usize = 2_000;

/// Truncates an arbitrarily long driver error message to the bound the
/// ledger and event log are willing to store.
pub fn bounded_summary(msg: &str) -> String {
    if msg.len() <= MAX_SUMMARY_LEN {
        msg.to_string()
    } else {
        let mut truncated = msg[..MAX_SUMMARY_LEN].to_string();
        truncated.push_str("...(truncated)");
        truncated
    }
}

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error("serialization lock unavailable for scope {0}")]
    LockUnavailable(String),
    #[error("precondition failed for step {step_sha}: {detail}")]
    PreconditionFailed { step_sha: String, detail: String },
    #[error("postcondition failed for step {step_sha}: {detail}")]
    PostconditionFailed { step_sha: String, detail: String },
    #[error("statement timeout for step {0}")]
    StatementTimeout(String),
    #[error("lock timeout for step {0}")]
    LockTimeout(String),
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("governor aborted execution: {0}")]
    GovernorAbort(String),
    #[error("external abort requested")]
    ExternalAbort,
    #[error("step {0} was previously recorded as failed and retry_failed is disabled")]
    PreviouslyFailed(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] migrate_core::ledger::LedgerError),
}

impl ExecError {
    /// Stable tag used in event payloads, independent of the `Display`
    /// message (which may carry step-specific detail).
    pub fn kind(&self) -> &'static str {
        match self {
            ExecError::LockUnavailable(_) => "LockUnavailable",
            ExecError::PreconditionFailed { .. } => "PreconditionFailed",
            ExecError::PostconditionFailed { .. } => "PostconditionFailed",
            ExecError::StatementTimeout(_) => "StatementTimeout",
            ExecError::LockTimeout(_) => "LockTimeout",
            ExecError::DatabaseError(_) => "DatabaseError",
            ExecError::GovernorAbort(_) => "GovernorAbort",
            ExecError::ExternalAbort => "ExternalAbort",
            ExecError::PreviouslyFailed(_) => "PreviouslyFailed",
            ExecError::Ledger(_) => "LedgerError",
        }
    }
}
