//! S.L.A.P.S.: drives an `AnnotatedPlan` through its state machine,
//! acquiring the serialization lock, applying governor directives,
//! invoking the database driver per step, recording to the ledger, and
//! emitting events.

use std::thread::sleep;
use std::time::{Duration, Instant};

use migrate_core::event::{Event, EventType};
use migrate_core::ledger::{Ledger, LedgerMeta, LedgerOutcome, LedgerState};
use migrate_core::model::{AnnotatedPlan, AnnotatedStep};
use migrate_core::EventLog;

use crate::config::ExecutorConfig;
use crate::driver::DatabaseDriver;
use crate::errors::{bounded_summary, ExecError};
use crate::governor::{Directive, Governor};
use crate::lock::SerializationLock;

use super::reconcile::reconcile_step;
use super::state::{ExecutionResult, FailureDetail, PlanState};

pub struct Executor<D, L, Ev, G, K> {
    pub driver: D,
    pub ledger: L,
    pub events: Ev,
    pub governor: G,
    pub lock: K,
    pub config: ExecutorConfig,
}

impl<D, L, Ev, G, K> Executor<D, L, Ev, G, K>
where
    D: DatabaseDriver,
    L: Ledger,
    Ev: EventLog,
    G: Governor,
    K: SerializationLock,
{
    pub fn new(driver: D, ledger: L, events: Ev, governor: G, lock: K, config: ExecutorConfig) -> Self {
        Self { driver, ledger, events, governor, lock, config }
    }

    /// Executes `plan` within `scope` (typically the target database
    /// name). `Err(ExecError::LockUnavailable)` means the plan never left
    /// `ANNOTATED`; every other outcome is an `Ok(ExecutionResult)` whose
    /// `terminal_state` names where the plan actually stopped.
    pub fn execute(&mut self, plan: &AnnotatedPlan, scope: &str) -> Result<ExecutionResult, ExecError> {
        tracing::debug!(plan_id = %plan.plan_id, scope, "acquiring serialization lock");
        let guard = self.lock.try_acquire(scope).ok_or_else(|| {
            tracing::error!(plan_id = %plan.plan_id, scope, "serialization lock unavailable");
            ExecError::LockUnavailable(scope.to_string())
        })?;

        let mut result = ExecutionResult::new();
        tracing::info!(plan_id = %plan.plan_id, steps = plan.step_count(), "plan execution starting");
        self.events.append(Event::builder(&plan.plan_id, EventType::PlanStart));

        'waves: for wave in &plan.waves {
            tracing::info!(plan_id = %plan.plan_id, wave = ?wave.name, "wave starting");
            self.events.append(Event::builder(&plan.plan_id, EventType::WaveStart).wave(wave.name));

            for step in &wave.steps {
                match self.gate_on_governor(&plan.plan_id) {
                    Ok(()) => {}
                    Err(abort_err) => {
                        tracing::error!(plan_id = %plan.plan_id, error = %abort_err, "governor aborted execution");
                        self.record_failure(&mut result, &plan.plan_id, None, &abort_err);
                        result.terminal_state = PlanState::Aborted;
                        drop(guard);
                        return Ok(result);
                    }
                }

                match self.run_step(&plan.plan_id, wave.name, step) {
                    StepOutcome::Applied => result.steps_applied += 1,
                    StepOutcome::Skipped => result.steps_skipped += 1,
                    StepOutcome::Failed(err) => {
                        tracing::error!(plan_id = %plan.plan_id, step_sha = %step.step_sha, error = %err, "step failed");
                        result.steps_failed += 1;
                        self.record_failure(&mut result, &plan.plan_id, Some(step.step_sha.clone()), &err);
                        self.events.append(Event::builder(&plan.plan_id, EventType::WaveFail).wave(wave.name));
                        result.terminal_state = PlanState::Failed;
                        break 'waves;
                    }
                }
            }

            tracing::info!(plan_id = %plan.plan_id, wave = ?wave.name, "wave completed");
            self.events.append(Event::builder(&plan.plan_id, EventType::WaveOk).wave(wave.name));
            result.waves_completed += 1;

            if self.config.wave_settle_ms > 0 {
                sleep(Duration::from_millis(self.config.wave_settle_ms));
            }
        }

        if result.terminal_state == PlanState::Running {
            result.terminal_state = PlanState::Completed;
            self.events.append(Event::builder(&plan.plan_id, EventType::PlanOk));
        } else if result.terminal_state == PlanState::Failed {
            self.events.append(Event::builder(&plan.plan_id, EventType::PlanFail));
        } else if result.terminal_state == PlanState::Aborted {
            self.events.append(Event::builder(&plan.plan_id, EventType::PlanAbort));
        }
        tracing::info!(plan_id = %plan.plan_id, terminal_state = ?result.terminal_state, "plan execution finished");

        drop(guard);
        Ok(result)
    }

    fn emit_step_fail(&mut self, plan_id: &str, step_sha: &str, err: &ExecError) {
        self.events.append(
            Event::builder(plan_id, EventType::StepFail)
                .step(step_sha.to_string())
                .payload(serde_json::json!({ "kind": err.kind() })),
        );
    }

    fn record_failure(&self, result: &mut ExecutionResult, _plan_id: &str, step_sha: Option<String>, err: &ExecError) {
        if result.first_failure.is_none() {
            result.first_failure = Some(FailureDetail {
                step_sha: step_sha.unwrap_or_default(),
                kind: err.kind().to_string(),
                message: bounded_summary(&err.to_string()),
            });
        }
    }

    /// Governor gate, run before each step. Returns `Err` carrying the
    /// abort reason if the plan should stop.
    fn gate_on_governor(&mut self, plan_id: &str) -> Result<(), ExecError> {
        let mut waited_ms: u64 = 0;
        loop {
            let sample = self.governor.sample();
            tracing::debug!(plan_id, ?sample, "governor sample");
            self.events.append(
                Event::builder(plan_id, EventType::GovernorSample)
                    .payload(crate::governor::timestamped_payload(&sample, chrono::Utc::now())),
            );
            let directive = self.governor.directive(&sample);
            self.events.append(
                Event::builder(plan_id, EventType::GovernorDirective)
                    .payload(serde_json::json!({ "directive": format!("{directive:?}") })),
            );

            match directive {
                Directive::Proceed => return Ok(()),
                Directive::Slow(factor) => {
                    tracing::warn!(plan_id, factor, "governor directed slowdown");
                    if self.config.base_step_delay_ms > 0 {
                        let delay_ms = (self.config.base_step_delay_ms as f64 * factor).round() as u64;
                        sleep(Duration::from_millis(delay_ms));
                    }
                    return Ok(());
                }
                Directive::Abort(reason) if reason == "external" => return Err(ExecError::ExternalAbort),
                Directive::Abort(reason) => return Err(ExecError::GovernorAbort(reason)),
                Directive::Pause(reason) => {
                    tracing::warn!(plan_id, reason, waited_ms, "governor directed pause");
                    if waited_ms >= self.config.governor_pause_cap_ms {
                        return Err(ExecError::GovernorAbort("governor_pause_cap".to_string()));
                    }
                    let step_ms = 100u64.min(self.config.governor_pause_cap_ms - waited_ms);
                    sleep(Duration::from_millis(step_ms));
                    waited_ms += step_ms;
                }
            }
        }
    }

    fn run_step(&mut self, plan_id: &str, wave_name: migrate_core::model::WavePhase, step: &AnnotatedStep) -> StepOutcome {
        match self.ledger.check(&step.step_sha) {
            LedgerState::Success => {
                self.events.append(Event::builder(plan_id, EventType::StepSkip).step(step.step_sha.clone()));
                return StepOutcome::Skipped;
            }
            LedgerState::Failed { .. } if !self.config.retry_failed => {
                return StepOutcome::Failed(ExecError::PreviouslyFailed(step.step_sha.clone()));
            }
            LedgerState::Pending => {
                if let Err(e) = reconcile_step(&mut self.driver, &mut self.ledger, step) {
                    return StepOutcome::Failed(e);
                }
                if matches!(self.ledger.check(&step.step_sha), LedgerState::Success) {
                    self.events.append(Event::builder(plan_id, EventType::StepSkip).step(step.step_sha.clone()));
                    return StepOutcome::Skipped;
                }
            }
            LedgerState::Absent | LedgerState::Failed { .. } => {}
        }

        self.events.append(Event::builder(plan_id, EventType::StepStart).wave(wave_name).step(step.step_sha.clone()));

        if let Err(e) = self.driver.set_session_timeouts(step.obligations.max_lock_ms, step.obligations.max_stmt_ms) {
            self.emit_step_fail(plan_id, &step.step_sha, &e);
            return StepOutcome::Failed(e);
        }

        for pre in &step.obligations.prechecks {
            match self.driver.evaluate(pre) {
                Ok(true) => {
                    tracing::debug!(plan_id, step_sha = %step.step_sha, ?pre, "precheck satisfied");
                }
                Ok(false) => {
                    let e = ExecError::PreconditionFailed { step_sha: step.step_sha.clone(), detail: format!("{pre:?}") };
                    self.emit_step_fail(plan_id, &step.step_sha, &e);
                    return StepOutcome::Failed(e);
                }
                Err(e) => {
                    self.emit_step_fail(plan_id, &step.step_sha, &e);
                    return StepOutcome::Failed(e);
                }
            }
        }

        let meta = LedgerMeta { plan_id: plan_id.to_string(), wave_name, applied_by: self.config.applied_by.clone() };
        if let Err(e) = self.ledger.begin(&step.step_sha, meta) {
            let e: ExecError = e.into();
            self.emit_step_fail(plan_id, &step.step_sha, &e);
            return StepOutcome::Failed(e);
        }
        self.events.append(Event::builder(plan_id, EventType::LedgerBegin).step(step.step_sha.clone()));

        let start = Instant::now();
        let exec_result = self.driver.execute(&step.step.op, &step.step_sha);
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let outcome = match exec_result {
            Ok(stmt) => stmt,
            Err(e) => {
                let _ = self.ledger.finalize(
                    &step.step_sha,
                    LedgerOutcome {
                        success: false,
                        execution_time_ms,
                        rows_affected: None,
                        error_summary: Some(bounded_summary(&e.to_string())),
                    },
                );
                self.events.append(Event::builder(plan_id, EventType::LedgerFinalize).step(step.step_sha.clone()));
                self.emit_step_fail(plan_id, &step.step_sha, &e);
                return StepOutcome::Failed(e);
            }
        };

        for post in &step.obligations.postchecks {
            match self.driver.evaluate(post) {
                Ok(true) => {
                    tracing::debug!(plan_id, step_sha = %step.step_sha, ?post, "postcheck satisfied");
                }
                Ok(false) => {
                    let e = ExecError::PostconditionFailed { step_sha: step.step_sha.clone(), detail: format!("{post:?}") };
                    let _ = self.ledger.finalize(
                        &step.step_sha,
                        LedgerOutcome {
                            success: false,
                            execution_time_ms,
                            rows_affected: outcome.rows_affected,
                            error_summary: Some(bounded_summary(&e.to_string())),
                        },
                    );
                    self.events.append(Event::builder(plan_id, EventType::LedgerFinalize).step(step.step_sha.clone()));
                    self.emit_step_fail(plan_id, &step.step_sha, &e);
                    return StepOutcome::Failed(e);
                }
                Err(e) => {
                    self.emit_step_fail(plan_id, &step.step_sha, &e);
                    return StepOutcome::Failed(e);
                }
            }
        }

        let _ = self.ledger.finalize(
            &step.step_sha,
            LedgerOutcome { success: true, execution_time_ms, rows_affected: outcome.rows_affected, error_summary: None },
        );
        self.events.append(Event::builder(plan_id, EventType::LedgerFinalize).step(step.step_sha.clone()));
        self.events.append(
            Event::builder(plan_id, EventType::StepOk).step(step.step_sha.clone()).payload(serde_json::json!({
                "execution_time_ms": execution_time_ms,
                "rows_affected": outcome.rows_affected,
            })),
        );

        StepOutcome::Applied
    }
}

enum StepOutcome {
    Applied,
    Skipped,
    Failed(ExecError),
}
