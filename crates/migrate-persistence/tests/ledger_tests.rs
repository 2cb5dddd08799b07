mod test_support;

use migrate_core::ledger::{Ledger, LedgerMeta, LedgerOutcome, LedgerState};
use migrate_core::model::WavePhase;
use migrate_persistence::pg::PgLedger;
use migrate_persistence::PoolProvider;

fn meta(plan_id: &str) -> LedgerMeta {
    LedgerMeta { plan_id: plan_id.to_string(), wave_name: WavePhase::Expand, applied_by: "integration-test".into() }
}

#[test]
fn begin_then_finalize_round_trips_through_postgres() {
    let Some(()) = test_support::with_pool(|pool| {
        let mut ledger = PgLedger::new(PoolProvider { pool: pool.clone() });
        let sha = format!("integration-{}", uuid::Uuid::new_v4());

        assert_eq!(ledger.check(&sha), LedgerState::Absent);
        ledger.begin(&sha, meta("plan-it-1")).unwrap();
        assert_eq!(ledger.check(&sha), LedgerState::Pending);

        let outcome = LedgerOutcome { success: true, execution_time_ms: 12, rows_affected: Some(3), error_summary: None };
        ledger.finalize(&sha, outcome).unwrap();
        assert_eq!(ledger.check(&sha), LedgerState::Success);

        let entry = ledger.entry(&sha).unwrap();
        assert_eq!(entry.rows_affected, Some(3));
    }) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
}

#[test]
fn begin_twice_is_rejected_by_the_unique_constraint() {
    let Some(()) = test_support::with_pool(|pool| {
        let mut ledger = PgLedger::new(PoolProvider { pool: pool.clone() });
        let sha = format!("integration-{}", uuid::Uuid::new_v4());

        ledger.begin(&sha, meta("plan-it-2")).unwrap();
        assert!(ledger.begin(&sha, meta("plan-it-2")).is_err());
    }) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
}
