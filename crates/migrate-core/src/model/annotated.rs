//! The output of the Planner: an immutable `AnnotatedPlan`, or a structured
//! `PlanRejection` naming the offending step. Annotation never mutates the
//! `PlanInput` it was built from — every derived field (fingerprint, hazard,
//! obligations) is computed once and owned by the annotated value.

use serde::{Deserialize, Serialize};

use super::hazard::{HazardClass, LockClass, Mode};
use super::obligation::Obligations;
use super::step::{Policy, Step, WavePhase};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedStep {
    pub step: Step,
    pub step_sha: String,
    pub hazard_class: HazardClass,
    pub lock_class: LockClass,
    pub obligations: Obligations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedWave {
    pub name: WavePhase,
    pub steps: Vec<AnnotatedStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedPlan {
    pub plan_id: String,
    pub title: String,
    pub reason: String,
    pub mode: Mode,
    /// Frozen snapshot of the policy actually applied (resolved defaults
    /// included), so replays never depend on ambient policy changes.
    pub policy: Policy,
    pub waves: Vec<AnnotatedWave>,
    pub max_hazard_class: HazardClass,
    pub chaos_compatible: bool,
}

impl AnnotatedPlan {
    pub fn step_count(&self) -> usize {
        self.waves.iter().map(|w| w.steps.len()).sum()
    }

    pub fn find_step(&self, step_sha: &str) -> Option<(&AnnotatedWave, &AnnotatedStep)> {
        self.waves.iter().find_map(|w| w.steps.iter().find(|s| s.step_sha == step_sha).map(|s| (w, s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum PlanRejectionKind {
    #[error("invalid step: {0}")]
    InvalidStep(String),
    #[error("policy violation: {0}")]
    PolicyViolation(String),
    #[error("duplicate step fingerprint")]
    DuplicateStep,
    #[error("wave order violation: {0}")]
    WaveOrderViolation(String),
    #[error("limits exceed an enclosing cap: {0}")]
    LimitsExceeded(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("plan rejected ({kind}) wave={wave_name:?} step_index={step_index:?}")]
pub struct PlanRejection {
    pub kind: PlanRejectionKind,
    pub wave_name: Option<WavePhase>,
    pub step_index: Option<usize>,
    pub step_sha: Option<String>,
}

impl PlanRejection {
    pub fn new(kind: PlanRejectionKind) -> Self {
        Self { kind, wave_name: None, step_index: None, step_sha: None }
    }

    pub fn at(mut self, wave_name: WavePhase, step_index: usize) -> Self {
        self.wave_name = Some(wave_name);
        self.step_index = Some(step_index);
        self
    }

    pub fn with_sha(mut self, step_sha: impl Into<String>) -> Self {
        self.step_sha = Some(step_sha.into());
        self
    }
}
