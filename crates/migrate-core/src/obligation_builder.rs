//! Derives proof obligations (pre/postcheck predicates) and resolves the
//! effective timeout budget for a step, enforcing the limits monotonicity
//! rule: step limit ≤ wave limit ≤ policy cap.

use crate::constants::default_limits;
use crate::model::{HazardClass, Limits, Obligations, Predicate, StepOp};

/// Builds the precheck/postcheck predicates for `op`. The postcheck is
/// typically the negation of the precheck, since a successfully applied
/// step flips the existence fact the precheck asserted didn't hold yet.
pub fn build_predicates(op: &StepOp) -> (Vec<Predicate>, Vec<Predicate>) {
    match op {
        StepOp::CreateView { .. } | StepOp::AddComment { .. } => (vec![], vec![]),

        StepOp::CreateTable { name, .. } => {
            let pre = Predicate::TableExists(name.clone()).not();
            let post = Predicate::TableExists(name.clone());
            (vec![pre], vec![post])
        }

        StepOp::AddColumn { table, name, .. } => {
            let pre = Predicate::TableExists(table.clone())
                .and(Predicate::ColumnExists(table.clone(), name.clone()).not());
            let post = Predicate::ColumnExists(table.clone(), name.clone());
            (vec![pre], vec![post])
        }

        StepOp::AddIndexConcurrently { name, .. } => match name {
            Some(n) => (vec![Predicate::IndexExists(n.clone()).not()], vec![Predicate::IndexExists(n.clone())]),
            None => (vec![], vec![]),
        },

        StepOp::AddIndexBlocking { name, .. } => match name {
            Some(n) => (vec![Predicate::IndexExists(n.clone()).not()], vec![Predicate::IndexExists(n.clone())]),
            None => (vec![], vec![]),
        },

        StepOp::AddForeignKeyNotValid { src, tgt, name, .. } => {
            let mut pre = Predicate::TableExists(src.clone()).and(Predicate::TableExists(tgt.clone()));
            if let Some(n) = name {
                pre = pre.and(Predicate::ConstraintExists(n.clone()).not());
            }
            let post = match name {
                Some(n) => vec![Predicate::ConstraintExists(n.clone())],
                None => vec![],
            };
            (vec![pre], post)
        }

        StepOp::ValidateConstraint { table, name } => (
            vec![Predicate::TableExists(table.clone()).and(Predicate::ConstraintExists(name.clone()))],
            vec![Predicate::ConstraintExists(name.clone())],
        ),

        StepOp::BackfillSql { .. } => (vec![], vec![]),

        StepOp::SetNotNull { table, column } => {
            (vec![Predicate::ColumnExists(table.clone(), column.clone())], vec![])
        }

        StepOp::DropColumn { table, column } => (
            vec![Predicate::ColumnExists(table.clone(), column.clone())],
            vec![Predicate::ColumnExists(table.clone(), column.clone()).not()],
        ),

        StepOp::DropTable { table } => {
            (vec![Predicate::TableExists(table.clone())], vec![Predicate::TableExists(table.clone()).not()])
        }

        StepOp::AlterColumnType { table, column, .. } => {
            (vec![Predicate::ColumnExists(table.clone(), column.clone())], vec![])
        }
    }
}

/// Resolves one timeout field through the step > wave > policy > hazard
/// default chain, enforcing that no override exceeds the cap one level up.
pub fn resolve_field(
    hazard_default: u64,
    policy: Option<u64>,
    wave: Option<u64>,
    step: Option<u64>,
) -> Result<u64, String> {
    let policy_cap = policy.unwrap_or(hazard_default);

    let wave_cap = match wave {
        Some(w) if w > policy_cap => {
            return Err(format!("wave limit {w} exceeds policy cap {policy_cap}"))
        }
        Some(w) => w,
        None => policy_cap,
    };

    match step {
        Some(s) if s > wave_cap => Err(format!("step limit {s} exceeds wave cap {wave_cap}")),
        Some(s) => Ok(s),
        None => Ok(wave_cap),
    }
}

/// Resolves the full `(max_lock_ms, max_stmt_ms)` pair for one step.
pub fn resolve_limits(
    hazard: HazardClass,
    policy: Option<Limits>,
    wave: Option<Limits>,
    step: Option<Limits>,
) -> Result<(u64, u64), String> {
    let base = default_limits(hazard);
    let lock_ms = resolve_field(
        base.max_lock_ms.expect("default always set"),
        policy.and_then(|l| l.max_lock_ms),
        wave.and_then(|l| l.max_lock_ms),
        step.and_then(|l| l.max_lock_ms),
    )?;
    let stmt_ms = resolve_field(
        base.max_stmt_ms.expect("default always set"),
        policy.and_then(|l| l.max_stmt_ms),
        wave.and_then(|l| l.max_stmt_ms),
        step.and_then(|l| l.max_stmt_ms),
    )?;
    Ok((lock_ms, stmt_ms))
}

/// Builds the full [`Obligations`] value for a step already classified
/// with `hazard`.
pub fn build(
    op: &StepOp,
    hazard: HazardClass,
    policy: Option<Limits>,
    wave: Option<Limits>,
    step: Option<Limits>,
) -> Result<Obligations, String> {
    let (prechecks, postchecks) = build_predicates(op);
    let (max_lock_ms, max_stmt_ms) = resolve_limits(hazard, policy, wave, step)?;
    Ok(Obligations { prechecks, postchecks, max_lock_ms, max_stmt_ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_column_predicates() {
        let op = StepOp::AddColumn {
            table: "employee".into(),
            name: "coffee_dep".into(),
            type_: "numeric".into(),
            nullable: true,
            default: None,
        };
        let (pre, post) = build_predicates(&op);
        assert_eq!(pre.len(), 1);
        assert_eq!(post, vec![Predicate::ColumnExists("employee".into(), "coffee_dep".into())]);
    }

    #[test]
    fn default_budget_for_h1() {
        let (lock_ms, stmt_ms) = resolve_limits(HazardClass::H1, None, None, None).unwrap();
        assert_eq!((lock_ms, stmt_ms), (2_000, 10_000));
    }

    #[test]
    fn default_budget_for_h2() {
        let (lock_ms, stmt_ms) = resolve_limits(HazardClass::H2, None, None, None).unwrap();
        assert_eq!((lock_ms, stmt_ms), (5_000, 60_000));
    }

    #[test]
    fn step_override_within_wave_cap_is_accepted() {
        let wave = Some(Limits { max_lock_ms: Some(1_500), max_stmt_ms: None });
        let step = Some(Limits { max_lock_ms: Some(1_000), max_stmt_ms: None });
        let (lock_ms, _) = resolve_limits(HazardClass::H1, None, wave, step).unwrap();
        assert_eq!(lock_ms, 1_000);
    }

    #[test]
    fn step_override_exceeding_wave_cap_is_rejected() {
        let wave = Some(Limits { max_lock_ms: Some(1_000), max_stmt_ms: None });
        let step = Some(Limits { max_lock_ms: Some(1_500), max_stmt_ms: None });
        assert!(resolve_limits(HazardClass::H1, None, wave, step).is_err());
    }

    #[test]
    fn wave_override_exceeding_policy_cap_is_rejected() {
        let policy = Some(Limits { max_lock_ms: Some(1_000), max_stmt_ms: None });
        let wave = Some(Limits { max_lock_ms: Some(1_500), max_stmt_ms: None });
        assert!(resolve_limits(HazardClass::H1, policy, wave, None).is_err());
    }
}
