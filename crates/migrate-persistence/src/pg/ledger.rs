//! Postgres-backed `Ledger`: the idempotency boundary, durable across
//! executor restarts.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use migrate_core::ledger::{Ledger, LedgerEntry, LedgerError, LedgerMeta, LedgerOutcome, LedgerState, RowStatus};

use crate::error::PersistenceError;
use crate::schema::ledger;
use crate::wave_codec::{wave_from_text, wave_to_text};

use super::{with_retry, ConnectionProvider};

#[derive(Queryable, Debug)]
struct LedgerRow {
    step_sha: String,
    plan_id: String,
    wave_name: String,
    applied_at: DateTime<Utc>,
    applied_by: String,
    status: String,
    execution_time_ms: Option<i64>,
    rows_affected: Option<i64>,
    error_summary: Option<String>,
}

impl LedgerRow {
    fn into_entry(self) -> LedgerEntry {
        LedgerEntry {
            step_sha: self.step_sha,
            plan_id: self.plan_id,
            wave_name: wave_from_text(&self.wave_name).expect("wave_name column holds a canonical phase"),
            applied_at: self.applied_at,
            applied_by: self.applied_by,
            status: match self.status.as_str() {
                "pending" => RowStatus::Pending,
                "success" => RowStatus::Success,
                "failed" => RowStatus::Failed,
                other => panic!("unknown ledger status column value: {other}"),
            },
            execution_time_ms: self.execution_time_ms.map(|v| v as u64),
            rows_affected: self.rows_affected.map(|v| v as u64),
            error_summary: self.error_summary,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = ledger)]
struct NewLedgerRow<'a> {
    step_sha: &'a str,
    plan_id: &'a str,
    wave_name: &'static str,
    applied_by: &'a str,
    status: &'static str,
    execution_time_ms: Option<i64>,
    rows_affected: Option<i64>,
    error_summary: Option<&'a str>,
}

/// Durable `Ledger` over a `ledger` table, one row per `step_sha`. Built
/// over a `ConnectionProvider` so unit tests can substitute a fake pool.
pub struct PgLedger<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgLedger<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Diagnostic read-only view for `ledger show <plan-id>`: every row
    /// recorded for a plan, in `applied_at` order.
    pub fn list_for_plan(&self, plan_id: &str) -> Vec<LedgerEntry> {
        let rows: Vec<LedgerRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            ledger::table.filter(ledger::plan_id.eq(plan_id)).order(ledger::applied_at.asc()).load(&mut conn).map_err(PersistenceError::from)
        })
        .unwrap_or_else(|e| panic!("ledger list for plan {plan_id}: {e}"));
        rows.into_iter().map(LedgerRow::into_entry).collect()
    }

    fn fetch(&self, step_sha: &str) -> Option<LedgerEntry> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            ledger::table
                .filter(ledger::step_sha.eq(step_sha))
                .first::<LedgerRow>(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .unwrap_or_else(|e| panic!("ledger fetch for {step_sha}: {e}"))
        .map(LedgerRow::into_entry)
    }
}

impl<P: ConnectionProvider> Ledger for PgLedger<P> {
    fn check(&self, step_sha: &str) -> LedgerState {
        self.fetch(step_sha).map(|e| e.state()).unwrap_or(LedgerState::Absent)
    }

    fn begin(&mut self, step_sha: &str, meta: LedgerMeta) -> Result<(), LedgerError> {
        let row = NewLedgerRow {
            step_sha,
            plan_id: &meta.plan_id,
            wave_name: wave_to_text(meta.wave_name),
            applied_by: &meta.applied_by,
            status: "pending",
            execution_time_ms: None,
            rows_affected: None,
            error_summary: None,
        };
        let result = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(ledger::table).values(&row).execute(&mut conn).map(|_| ()).map_err(PersistenceError::from)
        });
        match result {
            Ok(()) => Ok(()),
            Err(PersistenceError::UniqueViolation(_)) => Err(LedgerError::AlreadyPresent(step_sha.to_string())),
            Err(e) => panic!("ledger begin for {step_sha}: {e}"),
        }
    }

    fn finalize(&mut self, step_sha: &str, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        let status = if outcome.success { "success" } else { "failed" };
        let rows_updated = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(ledger::table.filter(ledger::step_sha.eq(step_sha)).filter(ledger::status.eq("pending")))
                .set((
                    ledger::status.eq(status),
                    ledger::execution_time_ms.eq(outcome.execution_time_ms as i64),
                    ledger::rows_affected.eq(outcome.rows_affected.map(|v| v as i64)),
                    ledger::error_summary.eq(outcome.error_summary.as_deref()),
                ))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .unwrap_or_else(|e| panic!("ledger finalize for {step_sha}: {e}"));

        if rows_updated == 0 {
            return Err(LedgerError::NotPending(step_sha.to_string()));
        }
        Ok(())
    }

    fn record(&mut self, step_sha: &str, meta: LedgerMeta, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        let status = if outcome.success { "success" } else { "failed" };
        let row = NewLedgerRow {
            step_sha,
            plan_id: &meta.plan_id,
            wave_name: wave_to_text(meta.wave_name),
            applied_by: &meta.applied_by,
            status,
            execution_time_ms: Some(outcome.execution_time_ms as i64),
            rows_affected: outcome.rows_affected.map(|v| v as i64),
            error_summary: outcome.error_summary.as_deref(),
        };
        let result = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(ledger::table).values(&row).execute(&mut conn).map(|_| ()).map_err(PersistenceError::from)
        });
        match result {
            Ok(()) => Ok(()),
            Err(PersistenceError::UniqueViolation(_)) => Err(LedgerError::AlreadyPresent(step_sha.to_string())),
            Err(e) => panic!("ledger record for {step_sha}: {e}"),
        }
    }

    fn entry(&self, step_sha: &str) -> Option<LedgerEntry> {
        self.fetch(step_sha)
    }
}
