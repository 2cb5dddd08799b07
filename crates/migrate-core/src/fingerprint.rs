//! Fingerprinter: the idempotency key computation, `step_sha`.
//!
//! Because [`StepOp`] is a closed, exhaustively-matched enum, a `Step` value
//! that exists in memory is already known-valid — there is no "unsupported
//! op variant" to reject once we're past deserialization. Rejecting
//! unparseable input therefore lives at the JSON boundary:
//! `fingerprint_json` is the fallible entry point external callers (the
//! CLI, HTTP glue) use, and it surfaces `CoreError::InvalidStep` for
//! anything that doesn't parse into a `Step`. `fingerprint`, given an
//! already-typed `Step`, is infallible.

use serde_json::{json, Value};

use crate::errors::CoreError;
use crate::hashing::hash_value;
use crate::model::Step;

/// Deterministic fingerprint of `(op, payload, limits)`, insensitive to map
/// key order and semantically-irrelevant whitespace, sensitive to every
/// other bit (names are case-preserved, since the step's `op` serializes
/// table/column identifiers verbatim).
pub fn fingerprint(step: &Step) -> String {
    hash_value(&fingerprint_input(step))
}

/// Parses `raw` into a `Step` and fingerprints it, for callers that only
/// have untyped JSON (e.g. re-hashing an externally-supplied plan document).
pub fn fingerprint_json(raw: &Value) -> Result<String, CoreError> {
    let step: Step = serde_json::from_value(raw.clone())
        .map_err(|e| CoreError::InvalidStep(format!("cannot decode step: {e}")))?;
    Ok(fingerprint(&step))
}

fn fingerprint_input(step: &Step) -> Value {
    json!({
        "op": serde_json::to_value(&step.op).expect("StepOp always serializes"),
        "limits": step.limits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Limits, StepOp};

    fn add_column(table: &str, name: &str) -> Step {
        Step {
            op: StepOp::AddColumn {
                table: table.to_string(),
                name: name.to_string(),
                type_: "numeric".to_string(),
                nullable: true,
                default: None,
            },
            limits: None,
            name: None,
        }
    }

    #[test]
    fn fingerprint_is_stable_across_step_name() {
        let mut a = add_column("employee", "coffee_dep");
        let mut b = a.clone();
        a.name = Some("add coffee_dep".to_string());
        b.name = None;
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_sensitive_to_table_case() {
        let a = add_column("employee", "x");
        let b = add_column("Employee", "x");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_ignores_whitespace_variation_in_sql() {
        let mut a = Step {
            op: StepOp::BackfillSql { sql: "update t  set x = 1\nwhere y is null".to_string(),
                                       rows_per_second: None,
                                       max_lock_ms: None },
            limits: None,
            name: None,
        };
        let mut b = a.clone();
        if let StepOp::BackfillSql { sql, .. } = &mut a.op {
            *sql = "update t set x = 1\nwhere y is null".to_string();
        }
        if let StepOp::BackfillSql { sql, .. } = &mut b.op {
            *sql = "update t set x = 1 where y is null".to_string();
        }
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_limits() {
        let mut a = add_column("t", "c");
        let mut b = a.clone();
        a.limits = Some(Limits { max_lock_ms: Some(1000), max_stmt_ms: None });
        b.limits = Some(Limits { max_lock_ms: Some(2000), max_stmt_ms: None });
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_json_rejects_unknown_op() {
        let raw = json!({"op": "teleport_table", "table": "t"});
        assert!(fingerprint_json(&raw).is_err());
    }
}
