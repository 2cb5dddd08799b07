//! Data model: plan input, hazard/lock scales, obligations, and the
//! annotated output of the planner.

pub mod annotated;
pub mod hazard;
pub mod obligation;
pub mod op;
pub mod step;

pub use annotated::{AnnotatedPlan, AnnotatedStep, AnnotatedWave, PlanRejection, PlanRejectionKind};
pub use hazard::{HazardClass, LockClass, Mode};
pub use obligation::{Obligations, Predicate};
pub use op::{ColumnDef, StepOp};
pub use step::{Limits, Policy, PlanInput, Step, Wave, WavePhase};
