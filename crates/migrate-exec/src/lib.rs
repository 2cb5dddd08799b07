//! migrate-exec: S.L.A.P.S., the executor that drives an `AnnotatedPlan`
//! through its state machine under serialization, governor, and timeout
//! discipline.
//!
//! Components:
//! - `executor`: the state machine (`Executor::execute`) and the
//!   `reconcile_pending` restart routine for the two-phase ledger
//!   protocol.
//! - `driver`: the database-driver boundary — predicate/statement
//!   rendering and the `DatabaseDriver` trait.
//! - `governor`: backpressure sampling and directive policy.
//! - `lock`: the cluster-wide `SerializationLock`.
//! - `config`: `ExecutorConfig`, constructed once and passed by value.
//! - `errors`: the executor's error taxonomy.
//! - `fake`: an in-memory `DatabaseDriver` used by this crate's tests.

pub mod config;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod fake;
pub mod governor;
pub mod lock;

pub use config::ExecutorConfig;
pub use driver::{DatabaseDriver, StatementOutcome};
pub use errors::ExecError;
pub use executor::{reconcile_pending, ExecutionResult, Executor, FailureDetail, PlanState};
pub use governor::{Directive, Governor, GovernorSample, NullGovernor, SimpleGovernor};
pub use lock::{InMemorySerializationLock, LockGuard, SerializationLock};
