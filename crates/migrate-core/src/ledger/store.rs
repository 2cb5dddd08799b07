//! The idempotency boundary: a `step_sha`-keyed store with at most one row
//! per fingerprint, ever, plus the in-memory reference implementation.

use std::collections::HashMap;

use chrono::Utc;

use super::types::{LedgerEntry, LedgerError, LedgerMeta, LedgerOutcome, LedgerState, RowStatus};

pub trait Ledger {
    fn check(&self, step_sha: &str) -> LedgerState;

    /// Inserts a pending row. Fails if a row already exists for `step_sha`
    /// in any state.
    fn begin(&mut self, step_sha: &str, meta: LedgerMeta) -> Result<(), LedgerError>;

    /// Transitions a pending row to `Success` or `Failed`. Fails if the row
    /// is absent or already terminal.
    fn finalize(&mut self, step_sha: &str, outcome: LedgerOutcome) -> Result<(), LedgerError>;

    /// One-shot terminal write for transactional steps that never go
    /// through a pending state.
    fn record(&mut self, step_sha: &str, meta: LedgerMeta, outcome: LedgerOutcome) -> Result<(), LedgerError>;

    fn entry(&self, step_sha: &str) -> Option<LedgerEntry>;
}

#[derive(Default)]
pub struct InMemoryLedger {
    rows: HashMap<String, LedgerEntry>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    fn check(&self, step_sha: &str) -> LedgerState {
        self.rows.get(step_sha).map(LedgerEntry::state).unwrap_or(LedgerState::Absent)
    }

    fn begin(&mut self, step_sha: &str, meta: LedgerMeta) -> Result<(), LedgerError> {
        if self.rows.contains_key(step_sha) {
            return Err(LedgerError::AlreadyPresent(step_sha.to_string()));
        }
        self.rows.insert(
            step_sha.to_string(),
            LedgerEntry {
                step_sha: step_sha.to_string(),
                plan_id: meta.plan_id,
                wave_name: meta.wave_name,
                applied_at: Utc::now(),
                applied_by: meta.applied_by,
                status: RowStatus::Pending,
                execution_time_ms: None,
                rows_affected: None,
                error_summary: None,
            },
        );
        Ok(())
    }

    fn finalize(&mut self, step_sha: &str, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        let row = self.rows.get_mut(step_sha).ok_or_else(|| LedgerError::NotPending(step_sha.to_string()))?;
        if row.status != RowStatus::Pending {
            return Err(LedgerError::NotPending(step_sha.to_string()));
        }
        row.status = if outcome.success { RowStatus::Success } else { RowStatus::Failed };
        row.execution_time_ms = Some(outcome.execution_time_ms);
        row.rows_affected = outcome.rows_affected;
        row.error_summary = outcome.error_summary;
        Ok(())
    }

    fn record(&mut self, step_sha: &str, meta: LedgerMeta, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        if self.rows.contains_key(step_sha) {
            return Err(LedgerError::AlreadyPresent(step_sha.to_string()));
        }
        self.rows.insert(
            step_sha.to_string(),
            LedgerEntry {
                step_sha: step_sha.to_string(),
                plan_id: meta.plan_id,
                wave_name: meta.wave_name,
                applied_at: Utc::now(),
                applied_by: meta.applied_by,
                status: if outcome.success { RowStatus::Success } else { RowStatus::Failed },
                execution_time_ms: Some(outcome.execution_time_ms),
                rows_affected: outcome.rows_affected,
                error_summary: outcome.error_summary,
            },
        );
        Ok(())
    }

    fn entry(&self, step_sha: &str) -> Option<LedgerEntry> {
        self.rows.get(step_sha).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WavePhase;

    fn meta() -> LedgerMeta {
        LedgerMeta { plan_id: "p1".into(), wave_name: WavePhase::Expand, applied_by: "tester".into() }
    }

    #[test]
    fn begin_then_finalize_success() {
        let mut ledger = InMemoryLedger::new();
        ledger.begin("sha1", meta()).unwrap();
        assert_eq!(ledger.check("sha1"), LedgerState::Pending);

        let outcome = LedgerOutcome { success: true, execution_time_ms: 10, rows_affected: Some(1), error_summary: None };
        ledger.finalize("sha1", outcome).unwrap();
        assert_eq!(ledger.check("sha1"), LedgerState::Success);
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut ledger = InMemoryLedger::new();
        ledger.begin("sha1", meta()).unwrap();
        assert!(ledger.begin("sha1", meta()).is_err());
    }

    #[test]
    fn finalize_on_absent_row_is_rejected() {
        let mut ledger = InMemoryLedger::new();
        let outcome = LedgerOutcome::default();
        assert!(ledger.finalize("sha1", outcome).is_err());
    }

    #[test]
    fn finalize_on_terminal_row_is_rejected() {
        let mut ledger = InMemoryLedger::new();
        ledger.begin("sha1", meta()).unwrap();
        let outcome = LedgerOutcome { success: true, execution_time_ms: 1, rows_affected: None, error_summary: None };
        ledger.finalize("sha1", outcome.clone()).unwrap();
        assert!(ledger.finalize("sha1", outcome).is_err());
    }

    #[test]
    fn record_is_one_shot() {
        let mut ledger = InMemoryLedger::new();
        let outcome = LedgerOutcome { success: true, execution_time_ms: 5, rows_affected: Some(3), error_summary: None };
        ledger.record("sha1", meta(), outcome).unwrap();
        assert_eq!(ledger.check("sha1"), LedgerState::Success);
    }

    #[test]
    fn check_absent_for_unknown_sha() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.check("nope"), LedgerState::Absent);
    }
}
