//! Two-phase reconciliation: on executor restart, a `Pending` ledger row
//! left by a non-transactional DDL step (one that can't be wrapped in a
//! database transaction, e.g. `add_index_concurrently`) must be resolved
//! by probing the database for the expected postcondition rather than
//! blindly re-running the statement.

use migrate_core::ledger::{Ledger, LedgerOutcome};
use migrate_core::model::AnnotatedPlan;

use crate::driver::DatabaseDriver;
use crate::errors::{bounded_summary, ExecError};

/// Resolves a single `Pending` row for `step` by evaluating its
/// postchecks. All true finalizes `Success`; any false finalizes
/// `Failed`. `execution_time_ms` is reported as `0` since the original
/// execution happened in a prior process.
pub fn reconcile_step<D: DatabaseDriver, L: Ledger>(
    driver: &mut D,
    ledger: &mut L,
    step: &migrate_core::model::AnnotatedStep,
) -> Result<(), ExecError> {
    let mut satisfied = true;
    for post in &step.obligations.postchecks {
        match driver.evaluate(post) {
            Ok(true) => {}
            Ok(false) => {
                satisfied = false;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    let outcome = if satisfied {
        LedgerOutcome { success: true, execution_time_ms: 0, rows_affected: None, error_summary: None }
    } else {
        LedgerOutcome {
            success: false,
            execution_time_ms: 0,
            rows_affected: None,
            error_summary: Some(bounded_summary("reconciliation: postcondition unmet after restart")),
        }
    };

    ledger.finalize(&step.step_sha, outcome).map_err(ExecError::from)
}

/// Scans every step of `plan` and reconciles any `Pending` ledger row
/// found, for use on executor startup before resuming execution. Steps
/// that are `Absent`, `Success`, or `Failed` are left untouched.
pub fn reconcile_pending<D: DatabaseDriver, L: Ledger>(
    driver: &mut D,
    ledger: &mut L,
    plan: &AnnotatedPlan,
) -> Result<usize, ExecError> {
    let mut reconciled = 0;
    for wave in &plan.waves {
        for step in &wave.steps {
            if matches!(ledger.check(&step.step_sha), migrate_core::ledger::LedgerState::Pending) {
                reconcile_step(driver, ledger, step)?;
                reconciled += 1;
            }
        }
    }
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDriver;
    use migrate_core::ledger::{InMemoryLedger, LedgerMeta, LedgerState};
    use migrate_core::model::WavePhase;
    use migrate_core::{plan as plan_fn, Mode, PlanInput, Step, StepOp, Wave};

    fn one_step_plan() -> AnnotatedPlan {
        let input = PlanInput {
            plan_id: Some("p1".into()),
            title: "t".into(),
            reason: "r".into(),
            mode: Mode::Ci,
            policy: None,
            waves: vec![Wave {
                name: WavePhase::Expand,
                limits: None,
                steps: vec![Step {
                    op: StepOp::AddIndexConcurrently {
                        table: "employee".into(),
                        cols: vec!["coffee_dep".into()],
                        name: Some("employee_coffee_dep_idx".into()),
                        where_: None,
                        unique: false,
                    },
                    limits: None,
                    name: None,
                }],
            }],
        };
        plan_fn(input).unwrap()
    }

    #[test]
    fn pending_row_finalizes_success_when_index_exists() {
        let plan = one_step_plan();
        let step = &plan.waves[0].steps[0];
        let mut ledger = InMemoryLedger::new();
        ledger
            .begin(&step.step_sha, LedgerMeta { plan_id: "p1".into(), wave_name: WavePhase::Expand, applied_by: "x".into() })
            .unwrap();

        let mut driver = FakeDriver::new().with_table("employee");
        driver.indexes.insert("employee_coffee_dep_idx".into());

        reconcile_step(&mut driver, &mut ledger, step).unwrap();
        assert_eq!(ledger.check(&step.step_sha), LedgerState::Success);
    }

    #[test]
    fn pending_row_finalizes_failed_when_index_absent() {
        let plan = one_step_plan();
        let step = &plan.waves[0].steps[0];
        let mut ledger = InMemoryLedger::new();
        ledger
            .begin(&step.step_sha, LedgerMeta { plan_id: "p1".into(), wave_name: WavePhase::Expand, applied_by: "x".into() })
            .unwrap();

        let mut driver = FakeDriver::new().with_table("employee");

        reconcile_step(&mut driver, &mut ledger, step).unwrap();
        assert!(matches!(ledger.check(&step.step_sha), LedgerState::Failed { .. }));
    }

    #[test]
    fn reconcile_pending_skips_non_pending_rows() {
        let plan = one_step_plan();
        let ledger = InMemoryLedger::new();
        let mut driver = FakeDriver::new().with_table("employee");
        let mut ledger = ledger;
        let reconciled = reconcile_pending(&mut driver, &mut ledger, &plan).unwrap();
        assert_eq!(reconciled, 0);
    }
}
