mod test_support;

use migrate_exec::SerializationLock;
use migrate_persistence::pg::PgSerializationLock;

#[test]
fn second_acquire_on_same_scope_blocks_until_released() {
    let Some(()) = test_support::with_pool(|pool| {
        let lock = PgSerializationLock::new(pool.clone());
        let scope = format!("integration-scope-{}", uuid::Uuid::new_v4());

        let guard = lock.try_acquire(&scope);
        assert!(guard.is_some());
        assert!(lock.try_acquire(&scope).is_none());

        drop(guard);
        assert!(lock.try_acquire(&scope).is_some());
    }) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
}
