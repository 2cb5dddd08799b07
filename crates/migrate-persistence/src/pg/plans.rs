//! `plans` table: per-plan lifecycle state, independent of the ledger and
//! event stream. Exists so a separate CLI invocation (`abort <plan-id>`)
//! can signal a plan an `apply` process is currently driving, without the
//! two sharing any in-process state.

use chrono::Utc;
use diesel::prelude::*;

use crate::error::PersistenceError;
use crate::schema::plans;

use super::{with_retry, ConnectionProvider};

pub struct PgPlanStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgPlanStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn annotate(&self, plan_id: &str) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(plans::table)
                .values((plans::plan_id.eq(plan_id), plans::state.eq("annotated")))
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .map(|_| ())
                .map_err(PersistenceError::from)
        })
    }

    pub fn start(&self, plan_id: &str) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(plans::table.filter(plans::plan_id.eq(plan_id)))
                .set((plans::state.eq("running"), plans::started_at.eq(Utc::now())))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(PersistenceError::from)
        })
    }

    pub fn terminate(&self, plan_id: &str, terminal_state: &str) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(plans::table.filter(plans::plan_id.eq(plan_id)))
                .set((plans::state.eq(terminal_state), plans::terminal_state.eq(terminal_state), plans::terminated_at.eq(Utc::now())))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(PersistenceError::from)
        })
    }

    /// Idempotent: requesting abort on a plan already in a terminal state
    /// is a no-op, per the abort-request contract.
    pub fn request_abort(&self, plan_id: &str) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(
                plans::table
                    .filter(plans::plan_id.eq(plan_id))
                    .filter(plans::terminal_state.is_null()),
            )
            .set(plans::state.eq("abort_requested"))
            .execute(&mut conn)
            .map(|_| ())
            .map_err(PersistenceError::from)
        })
    }

    pub fn is_abort_requested(&self, plan_id: &str) -> Result<bool, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let state: Option<String> =
                plans::table.filter(plans::plan_id.eq(plan_id)).select(plans::state).first(&mut conn).optional().map_err(PersistenceError::from)?;
            Ok(state.as_deref() == Some("abort_requested"))
        })
    }
}

/// `Governor` that proceeds unconditionally except for polling the `plans`
/// table's abort-request flag before every step. Doesn't sample real
/// database health signals; pair it with a real sampler (e.g. wrap
/// `SimpleGovernor`'s pause/slow logic in front of this) when that's
/// available.
pub struct PgAbortPollingGovernor<P: ConnectionProvider> {
    store: PgPlanStore<P>,
    plan_id: String,
}

impl<P: ConnectionProvider> PgAbortPollingGovernor<P> {
    pub fn new(provider: P, plan_id: impl Into<String>) -> Self {
        Self { store: PgPlanStore::new(provider), plan_id: plan_id.into() }
    }
}

impl<P: ConnectionProvider> migrate_exec::Governor for PgAbortPollingGovernor<P> {
    fn sample(&mut self) -> migrate_exec::GovernorSample {
        migrate_exec::GovernorSample { active_connections: 0, recent_error_rate: 0.0, long_running_statements: 0, replication_lag_ms: None }
    }

    fn directive(&self, _sample: &migrate_exec::GovernorSample) -> migrate_exec::Directive {
        match self.store.is_abort_requested(&self.plan_id) {
            Ok(true) => migrate_exec::Directive::Abort("external".to_string()),
            Ok(false) => migrate_exec::Directive::Proceed,
            Err(e) => {
                tracing::warn!(plan_id = %self.plan_id, error = %e, "abort-flag poll failed, proceeding");
                migrate_exec::Directive::Proceed
            }
        }
    }
}
