//! migrate-core: the planner, its safety analyzers, and the durable
//! primitives that make execution idempotent.
//!
//! Components:
//! - `model`: plan input, hazard/lock scales, proof obligations, and the
//!   immutable `AnnotatedPlan` the planner produces.
//! - `fingerprint`: deterministic canonical encoding + digest of a step,
//!   the `step_sha` idempotency key.
//! - `hazard_classifier`: maps a step's operation to `(HazardClass,
//!   LockClass)`.
//! - `obligation_builder`: derives pre/postcheck predicates and resolves
//!   the timeout budget chain (step > wave > policy > hazard default).
//! - `planner`: validates and annotates a `PlanInput`, or rejects it.
//! - `event`: the event vocabulary and `EventLog` trait.
//! - `ledger`: the idempotency boundary and its two-phase protocol.
//! - `hashing`: canonical JSON encoding and blake3 digest helpers.
//! - `errors`: step-level error taxonomy.

pub mod constants;
pub mod errors;
pub mod event;
pub mod fingerprint;
pub mod hashing;
pub mod hazard_classifier;
pub mod ledger;
pub mod model;
pub mod obligation_builder;
pub mod planner;

pub use errors::CoreError;
pub use event::{Event, EventLog, EventType, InMemoryEventLog};
pub use fingerprint::fingerprint;
pub use hazard_classifier::classify;
pub use ledger::{InMemoryLedger, Ledger, LedgerEntry, LedgerState};
pub use model::{
    AnnotatedPlan, AnnotatedStep, AnnotatedWave, HazardClass, LockClass, Mode, PlanInput, PlanRejection,
    PlanRejectionKind, Step, StepOp, Wave, WavePhase,
};
pub use planner::plan;
