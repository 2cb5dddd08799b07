//! Errors raised while computing step-level derived data (fingerprint,
//! obligations). These are distinct from [`crate::planner::PlanRejection`],
//! which is the plan-level structured result the Planner returns; a
//! `CoreError` surfacing mid-annotation gets folded into a `PlanRejection`
//! with the offending step's coordinates attached.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid step: {0}")]
    InvalidStep(String),
}
