//! Fixed constants pinned to exact values: default timeout budgets per
//! hazard class, and the fingerprint/model version stamped into
//! annotated plans so replays can detect a classifier change.

use crate::model::{HazardClass, Limits};

/// Bumped whenever the fingerprint canonicalization or classifier logic
/// changes in a way that would shift `step_sha` for existing input.
pub const MODEL_VERSION: u32 = 1;

pub fn default_limits(hazard: HazardClass) -> Limits {
    match hazard {
        HazardClass::H0 | HazardClass::H1 => Limits { max_lock_ms: Some(2_000), max_stmt_ms: Some(10_000) },
        HazardClass::H2 => Limits { max_lock_ms: Some(5_000), max_stmt_ms: Some(60_000) },
        HazardClass::H3 => Limits { max_lock_ms: Some(10_000), max_stmt_ms: Some(300_000) },
    }
}
