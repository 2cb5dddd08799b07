//! `PgDriver`: the real `DatabaseDriver`, executing rendered SQL against a
//! live connection with session-scoped `lock_timeout`/`statement_timeout`.

use diesel::connection::SimpleConnection;
use diesel::sql_types::Bool;
use diesel::{QueryableByName, RunQueryDsl};

use migrate_core::model::{Predicate, StepOp};
use migrate_exec::driver::{render_predicate, render_statement};
use migrate_exec::{DatabaseDriver, ExecError, StatementOutcome};

use super::ConnectionProvider;

#[derive(QueryableByName)]
struct BoolResult {
    #[diesel(sql_type = Bool)]
    value: bool,
}

/// Executes against a single connection checked out fresh per call. Real
/// deployments that want a whole plan on one connection (so session-scoped
/// timeouts actually persist across steps) should hold the checkout
/// themselves and pass a `ConnectionProvider` that always returns it.
pub struct PgDriver<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgDriver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> DatabaseDriver for PgDriver<P> {
    fn set_session_timeouts(&mut self, max_lock_ms: u64, max_stmt_ms: u64) -> Result<(), ExecError> {
        let mut conn = self.provider.connection()?;
        let sql = format!("SET lock_timeout = '{max_lock_ms}ms'; SET statement_timeout = '{max_stmt_ms}ms';");
        conn.batch_execute(&sql).map_err(|e| ExecError::DatabaseError(e.to_string()))
    }

    fn evaluate(&mut self, predicate: &Predicate) -> Result<bool, ExecError> {
        let mut conn = self.provider.connection()?;
        let sql = format!("SELECT ({}) AS value", render_predicate(predicate));
        let result: BoolResult = diesel::sql_query(sql).get_result(&mut conn).map_err(|e| ExecError::DatabaseError(e.to_string()))?;
        Ok(result.value)
    }

    fn execute(&mut self, op: &StepOp, step_sha: &str) -> Result<StatementOutcome, ExecError> {
        let mut conn = self.provider.connection()?;
        let sql = render_statement(op);
        tracing::debug!(step_sha, sql = %sql, "executing step statement");
        conn.batch_execute(&sql).map_err(|e| {
            let message = e.to_string();
            let lower = message.to_lowercase();
            if lower.contains("statement timeout") {
                ExecError::StatementTimeout(step_sha.to_string())
            } else if lower.contains("lock timeout") {
                ExecError::LockTimeout(step_sha.to_string())
            } else {
                ExecError::DatabaseError(message)
            }
        })?;
        Ok(StatementOutcome { rows_affected: None })
    }
}
