//! Postgres (Diesel) implementations of the core traits.
//!
//! Goals:
//! - Durable parity with the in-memory reference implementations in
//!   `migrate-core`/`migrate-exec`: same idempotency guarantees, same event
//!   vocabulary, same serialization semantics.
//! - Keep the mapping between domain types and DB rows isolated here,
//!   behind `ConnectionProvider` so it stays testable without a live
//!   database.
//!
//! Submodules:
//! - `ledger`: `PgLedger`, the durable idempotency boundary.
//! - `event_log`: `PgEventLog`, the append-only event stream.
//! - `lock`: `PgSerializationLock`, backed by `pg_try_advisory_lock`.
//! - `driver`: `PgDriver`, the real `DatabaseDriver` that executes rendered
//!   SQL against a live connection.

mod driver;
mod event_log;
mod ledger;
mod lock;
mod plans;

pub use driver::PgDriver;
pub use event_log::PgEventLog;
pub use ledger::PgLedger;
pub use lock::PgSerializationLock;
pub use plans::{PgAbortPollingGovernor, PgPlanStore};

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PooledConn = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Abstracts connection acquisition so the `pg` submodules can be exercised
/// against a fake provider in unit tests, without a live pool.
pub trait ConnectionProvider: Send + Sync {
    fn connection(&self) -> Result<PooledConn, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PooledConn, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// True for errors worth a bounded retry: serialization conflicts and
/// connection-pool hiccups. Everything else (constraint violations,
/// malformed input) is permanent and retrying would just repeat it.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
                || m.contains("could not serialize access due to concurrent update")
                || m.contains("terminating connection due to administrator command")
                || m.contains("connection closed")
                || m.contains("connection refused")
                || m.contains("timeout")
        }
        _ => false,
    }
}

/// Small fixed backoff: 3 attempts, 15/30/45ms. Doesn't alter the
/// semantics of the retried closure, only how many times it runs.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
where
    F: FnMut() -> Result<T, PersistenceError>,
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * (attempts + 1);
                tracing::warn!(attempt = attempts + 1, error = %e, delay_ms, "retrying persistence operation");
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Builds an r2d2 pool and runs pending migrations against the first
/// checked-out connection.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1).max(validated_min);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .min_idle(Some(validated_min))
        .max_size(validated_max)
        .build(manager)
        .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Development convenience: loads `.env`, reads `DbConfig`, builds a
/// migrated pool.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
