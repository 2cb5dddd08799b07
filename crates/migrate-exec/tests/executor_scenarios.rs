//! End-to-end scenarios mirroring the executor's literal test seeds:
//! happy path, idempotent re-run, serialization, and statement timeout.

use std::time::Duration;

use migrate_core::event::InMemoryEventLog;
use migrate_core::ledger::{InMemoryLedger, LedgerState};
use migrate_core::{plan as plan_fn, Ledger, Mode, PlanInput, Step, StepOp, Wave, WavePhase};
use migrate_exec::{
    ExecError, ExecutionResult, Executor, ExecutorConfig, InMemorySerializationLock, NullGovernor, PlanState,
    SerializationLock,
};
use migrate_exec::fake::FakeDriver;

fn add_column_plan() -> PlanInput {
    PlanInput {
        plan_id: Some("scenario-1".into()),
        title: "t".into(),
        reason: "r".into(),
        mode: Mode::Chaos,
        policy: None,
        waves: vec![Wave {
            name: WavePhase::Expand,
            limits: None,
            steps: vec![Step {
                op: StepOp::AddColumn {
                    table: "employee".into(),
                    name: "coffee_dep".into(),
                    type_: "numeric".into(),
                    nullable: true,
                    default: None,
                },
                limits: None,
                name: None,
            }],
        }],
    }
}

fn new_executor() -> Executor<FakeDriver, InMemoryLedger, InMemoryEventLog, NullGovernor, InMemorySerializationLock> {
    Executor::new(
        FakeDriver::new().with_table("employee"),
        InMemoryLedger::new(),
        InMemoryEventLog::new(),
        NullGovernor::new(),
        InMemorySerializationLock::new(),
        ExecutorConfig::default(),
    )
}

#[test]
fn happy_path_chaos_single_add_column() {
    let annotated = plan_fn(add_column_plan()).unwrap();
    assert_eq!(annotated.max_hazard_class, migrate_core::HazardClass::H1);
    assert!(annotated.chaos_compatible);

    let mut executor = new_executor();
    let result = executor.execute(&annotated, "db1").unwrap();

    assert_eq!(result.terminal_state, PlanState::Completed);
    assert_eq!(result.steps_applied, 1);
    assert_eq!(result.steps_skipped, 0);
    let entry = executor.ledger.entry(&annotated.waves[0].steps[0].step_sha).unwrap();
    assert_eq!(entry.state(), LedgerState::Success);
}

#[test]
fn idempotent_rerun_skips_on_second_pass() {
    let annotated = plan_fn(add_column_plan()).unwrap();
    let mut executor = new_executor();

    let first = executor.execute(&annotated, "db1").unwrap();
    assert_eq!(first.steps_applied, 1);

    let second = executor.execute(&annotated, "db1").unwrap();
    assert_eq!(second.terminal_state, PlanState::Completed);
    assert_eq!(second.steps_applied, 0);
    assert_eq!(second.steps_skipped, 1);
}

#[test]
fn overlapping_execution_on_same_scope_fails_fast() {
    let annotated = plan_fn(add_column_plan()).unwrap();
    let lock = InMemorySerializationLock::new();
    let _held_elsewhere = lock.try_acquire("db1").unwrap();

    let mut executor = Executor::new(
        FakeDriver::new().with_table("employee"),
        InMemoryLedger::new(),
        InMemoryEventLog::new(),
        NullGovernor::new(),
        lock,
        ExecutorConfig::default(),
    );

    let result = executor.execute(&annotated, "db1");
    assert!(matches!(result, Err(ExecError::LockUnavailable(_))));
}

fn backfill_plan_with_tight_timeout() -> PlanInput {
    PlanInput {
        plan_id: Some("scenario-6".into()),
        title: "t".into(),
        reason: "r".into(),
        mode: Mode::Ci,
        policy: None,
        waves: vec![Wave {
            name: WavePhase::Backfill,
            limits: None,
            steps: vec![Step {
                op: StepOp::BackfillSql { sql: "update employee set paid = true".into(), rows_per_second: None, max_lock_ms: None },
                limits: Some(migrate_core::model::Limits { max_lock_ms: None, max_stmt_ms: Some(100) }),
                name: None,
            }],
        }],
    }
}

#[test]
fn backfill_exceeding_statement_timeout_fails_the_plan() {
    let annotated = plan_fn(backfill_plan_with_tight_timeout()).unwrap();
    let mut driver = FakeDriver::new().with_table("employee");
    driver.simulated_duration = Some(Duration::from_millis(250));

    let mut executor = Executor::new(
        driver,
        InMemoryLedger::new(),
        InMemoryEventLog::new(),
        NullGovernor::new(),
        InMemorySerializationLock::new(),
        ExecutorConfig::default(),
    );

    let result: ExecutionResult = executor.execute(&annotated, "db1").unwrap();
    assert_eq!(result.terminal_state, PlanState::Failed);
    let failure = result.first_failure.unwrap();
    assert_eq!(failure.kind, "StatementTimeout");

    let entry = executor.ledger.entry(&annotated.waves[0].steps[0].step_sha).unwrap();
    assert!(matches!(entry.state(), LedgerState::Failed { .. }));
}
