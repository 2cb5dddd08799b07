//! Postgres-backed `SerializationLock` using session-level advisory locks
//! (`pg_try_advisory_lock`). Mutual exclusion holds across processes, not
//! just within one, which is what the in-memory reference implementation
//! can't give you.

use diesel::sql_types::{BigInt, Bool};
use diesel::{QueryableByName, RunQueryDsl};

use migrate_exec::{LockGuard, SerializationLock};

use super::PooledConn;

/// Maps a scope string onto a stable 64-bit key. Advisory locks key on
/// `bigint`, not text, so the scope name is hashed once here.
fn advisory_key(scope: &str) -> i64 {
    fnv1a(scope.as_bytes()) as i64
}

/// FNV-1a. Collisions would merge the mutual exclusion of two different
/// scopes; acceptable for the small, known set of target database names
/// this system locks on.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[derive(QueryableByName)]
struct TryLockResult {
    #[diesel(sql_type = Bool)]
    locked: bool,
}

/// Backed directly by a `PgPool` rather than `ConnectionProvider`: the
/// guard must hold the exact connection the lock was taken on for its
/// entire lifetime, since advisory locks are session-scoped.
pub struct PgSerializationLock {
    pool: super::PgPool,
}

impl PgSerializationLock {
    pub fn new(pool: super::PgPool) -> Self {
        Self { pool }
    }
}

impl SerializationLock for PgSerializationLock {
    fn try_acquire(&self, scope: &str) -> Option<Box<dyn LockGuard>> {
        let mut conn = self.pool.get().ok()?;
        let key = advisory_key(scope);
        let result: TryLockResult =
            diesel::sql_query("SELECT pg_try_advisory_lock($1) AS locked").bind::<BigInt, _>(key).get_result(&mut conn).ok()?;
        if !result.locked {
            return None;
        }
        Some(Box::new(PgLockGuard { scope: scope.to_string(), key, conn }))
    }
}

struct PgLockGuard {
    scope: String,
    key: i64,
    conn: PooledConn,
}

impl LockGuard for PgLockGuard {
    fn scope(&self) -> &str {
        &self.scope
    }
}

impl Drop for PgLockGuard {
    fn drop(&mut self) {
        let _: Result<TryLockResult, _> =
            diesel::sql_query("SELECT pg_advisory_unlock($1) AS locked").bind::<BigInt, _>(self.key).get_result(&mut self.conn);
    }
}
