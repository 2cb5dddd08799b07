//! SerializationLock: cluster-wide advisory lock ensuring at most one
//! active executor per scope (typically the target database name).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub trait SerializationLock: Send + Sync {
    /// Attempts to acquire the lock for `scope`. Returns a guard that
    /// releases the lock on drop, or `None` if another executor holds it.
    fn try_acquire(&self, scope: &str) -> Option<Box<dyn LockGuard>>;
}

pub trait LockGuard: Send {
    fn scope(&self) -> &str;
}

/// A single-process reference implementation. Real deployments back this
/// with a Postgres advisory lock (`pg_try_advisory_lock`) so the mutual
/// exclusion holds across executor processes, not just within one.
/// `Clone` shares the same underlying lock table — cloning does not give
/// you a second, independent lock.
#[derive(Default, Clone)]
pub struct InMemorySerializationLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl InMemorySerializationLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerializationLock for InMemorySerializationLock {
    fn try_acquire(&self, scope: &str) -> Option<Box<dyn LockGuard>> {
        let mut held = self.held.lock().expect("lock poisoned");
        if held.contains(scope) {
            return None;
        }
        held.insert(scope.to_string());
        Some(Box::new(InMemoryGuard { scope: scope.to_string(), held: self.held.clone() }))
    }
}

struct InMemoryGuard {
    scope: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl LockGuard for InMemoryGuard {
    fn scope(&self) -> &str {
        &self.scope
    }
}

impl Drop for InMemoryGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&self.scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_scope_fails() {
        let lock = InMemorySerializationLock::new();
        let guard1 = lock.try_acquire("db1");
        assert!(guard1.is_some());
        assert!(lock.try_acquire("db1").is_none());
    }

    #[test]
    fn dropping_guard_releases_scope() {
        let lock = InMemorySerializationLock::new();
        {
            let _guard = lock.try_acquire("db1").unwrap();
            assert!(lock.try_acquire("db1").is_none());
        }
        assert!(lock.try_acquire("db1").is_some());
    }

    #[test]
    fn distinct_scopes_are_independent() {
        let lock = InMemorySerializationLock::new();
        let _g1 = lock.try_acquire("db1").unwrap();
        assert!(lock.try_acquire("db2").is_some());
    }
}
