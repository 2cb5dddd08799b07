//! Plan input types: the shape callers submit, before annotation.

use serde::{Deserialize, Serialize};

use super::hazard::{HazardClass, Mode};
use super::op::StepOp;

/// Per-step or per-wave timeout override. `None` fields fall through to the
/// next level up in the resolution chain (step > wave > policy > hazard
/// default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub max_lock_ms: Option<u64>,
    pub max_stmt_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: StepOp,
    #[serde(default)]
    pub limits: Option<Limits>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The five canonical phases, in the fixed order waves must respect. A plan
/// may omit phases but never reorder them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WavePhase {
    Plan,
    Expand,
    Backfill,
    Validate,
    Contract,
}

impl WavePhase {
    pub const CANONICAL_ORDER: [WavePhase; 5] =
        [WavePhase::Plan, WavePhase::Expand, WavePhase::Backfill, WavePhase::Validate, WavePhase::Contract];

    pub fn phase_index(self) -> usize {
        Self::CANONICAL_ORDER.iter().position(|p| *p == self).expect("exhaustive")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub name: WavePhase,
    #[serde(default)]
    pub limits: Option<Limits>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    pub max_hazard: Option<HazardClass>,
    pub default_timeouts: Option<Limits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub plan_id: Option<String>,
    pub title: String,
    pub reason: String,
    pub mode: Mode,
    #[serde(default)]
    pub policy: Option<Policy>,
    pub waves: Vec<Wave>,
}
