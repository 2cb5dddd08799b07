//! T.A.S.K.S.: validates a [`PlanInput`] and produces an immutable
//! [`AnnotatedPlan`], or a structured [`PlanRejection`] naming the
//! offending wave/step. Never touches a database or the ledger — annotation
//! is pure.

use std::collections::HashSet;

use uuid::Uuid;

use crate::fingerprint::fingerprint;
use crate::hazard_classifier::classify;
use crate::model::{
    AnnotatedPlan, AnnotatedStep, AnnotatedWave, HazardClass, PlanInput, PlanRejection, PlanRejectionKind, Policy,
    WavePhase,
};
use crate::obligation_builder::build;

pub fn plan(input: PlanInput) -> Result<AnnotatedPlan, PlanRejection> {
    check_wave_order(&input.waves)?;

    let policy = input.policy.clone().unwrap_or_default();
    let mut seen_shas: HashSet<String> = HashSet::new();
    let mut max_hazard = HazardClass::H0;
    let mut waves = Vec::with_capacity(input.waves.len());

    for wave in &input.waves {
        let mut steps = Vec::with_capacity(wave.steps.len());
        for (step_index, step) in wave.steps.iter().enumerate() {
            let (hazard_class, lock_class) = classify(&step.op);
            if hazard_class > max_hazard {
                max_hazard = hazard_class;
            }

            let step_sha = fingerprint(step);
            if !seen_shas.insert(step_sha.clone()) {
                return Err(PlanRejection::new(PlanRejectionKind::DuplicateStep)
                    .at(wave.name, step_index)
                    .with_sha(step_sha));
            }

            let obligations = build(&step.op, hazard_class, policy.default_timeouts, wave.limits, step.limits)
                .map_err(|e| {
                    PlanRejection::new(PlanRejectionKind::LimitsExceeded(e))
                        .at(wave.name, step_index)
                        .with_sha(step_sha.clone())
                })?;

            steps.push(AnnotatedStep { step: step.clone(), step_sha, hazard_class, lock_class, obligations });
        }
        waves.push(AnnotatedWave { name: wave.name, steps });
    }

    let mode_cap = input.mode.max_hazard();
    if max_hazard > mode_cap {
        return Err(PlanRejection::new(PlanRejectionKind::PolicyViolation(format!(
            "plan max hazard {max_hazard:?} exceeds {:?} mode cap {mode_cap:?}",
            input.mode
        ))));
    }
    if let Some(declared_cap) = policy.max_hazard {
        if max_hazard > declared_cap {
            return Err(PlanRejection::new(PlanRejectionKind::PolicyViolation(format!(
                "plan max hazard {max_hazard:?} exceeds declared policy cap {declared_cap:?}"
            ))));
        }
    }

    let plan_id = input.plan_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let chaos_compatible = max_hazard <= crate::model::Mode::Chaos.max_hazard();
    let frozen_policy =
        Policy { max_hazard: Some(policy.max_hazard.unwrap_or(mode_cap)), default_timeouts: policy.default_timeouts };

    Ok(AnnotatedPlan {
        plan_id,
        title: input.title,
        reason: input.reason,
        mode: input.mode,
        policy: frozen_policy,
        waves,
        max_hazard_class: max_hazard,
        chaos_compatible,
    })
}

fn check_wave_order(waves: &[crate::model::Wave]) -> Result<(), PlanRejection> {
    let mut last_index: Option<usize> = None;
    for (i, wave) in waves.iter().enumerate() {
        let idx = wave.name.phase_index();
        if let Some(last) = last_index {
            if idx <= last {
                return Err(PlanRejection::new(PlanRejectionKind::WaveOrderViolation(format!(
                    "wave {:?} at position {i} is out of canonical order",
                    wave.name
                )))
                .at(wave.name, 0));
            }
        }
        last_index = Some(idx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mode, Step, StepOp, Wave};

    fn add_column_plan(mode: Mode) -> PlanInput {
        PlanInput {
            plan_id: None,
            title: "t".into(),
            reason: "r".into(),
            mode,
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

    #[test]
    fn happy_path_chaos_add_column() {
        let annotated = plan(add_column_plan(Mode::Chaos)).unwrap();
        assert_eq!(annotated.max_hazard_class, HazardClass::H1);
        assert!(annotated.chaos_compatible);
        assert_eq!(annotated.step_count(), 1);
    }

    #[test]
    fn drop_table_rejected_in_chaos_mode() {
        let mut input = add_column_plan(Mode::Chaos);
        input.waves[0].steps[0] = Step { op: StepOp::DropTable { table: "employee".into() }, limits: None, name: None };
        let err = plan(input).unwrap_err();
        assert!(matches!(err.kind, PlanRejectionKind::PolicyViolation(_)));
    }

    #[test]
    fn drop_table_accepted_in_ci_mode() {
        let mut input = add_column_plan(Mode::Ci);
        input.waves[0].steps[0] = Step { op: StepOp::DropTable { table: "employee".into() }, limits: None, name: None };
        let annotated = plan(input).unwrap();
        assert_eq!(annotated.max_hazard_class, HazardClass::H3);
        assert!(!annotated.chaos_compatible);
    }

    #[test]
    fn duplicate_step_is_rejected() {
        let mut input = add_column_plan(Mode::Chaos);
        let dup = input.waves[0].steps[0].clone();
        input.waves[0].steps.push(dup);
        let err = plan(input).unwrap_err();
        assert!(matches!(err.kind, PlanRejectionKind::DuplicateStep));
        assert_eq!(err.step_index, Some(1));
    }

    #[test]
    fn out_of_order_waves_are_rejected() {
        let mut input = add_column_plan(Mode::Chaos);
        input.waves.push(Wave { name: WavePhase::Plan, limits: None, steps: vec![] });
        let err = plan(input).unwrap_err();
        assert!(matches!(err.kind, PlanRejectionKind::WaveOrderViolation(_)));
    }

    #[test]
    fn plan_id_is_generated_when_absent() {
        let annotated = plan(add_column_plan(Mode::Chaos)).unwrap();
        assert!(!annotated.plan_id.is_empty());
    }

    #[test]
    fn plan_id_is_preserved_when_supplied() {
        let mut input = add_column_plan(Mode::Chaos);
        input.plan_id = Some("my-plan".into());
        let annotated = plan(input).unwrap();
        assert_eq!(annotated.plan_id, "my-plan");
    }
}
