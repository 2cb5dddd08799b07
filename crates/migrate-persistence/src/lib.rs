//! Postgres-backed implementations of migrate-core's `Ledger`/`EventLog`
//! and migrate-exec's `SerializationLock`/`DatabaseDriver`, plus the
//! connection pooling, configuration, and migration plumbing they share.
//!
//! Modules:
//! - `pg`: the Diesel-backed trait implementations.
//! - `config`: `.env`-driven `DbConfig`.
//! - `error`: `PersistenceError`, the Diesel error classification.
//! - `schema`: the Diesel table declarations for `ledger`/`events`/`plans`.
//! - `migrations`: the embedded migration set.
//! - `wave_codec`: `WavePhase` <-> TEXT column encoding shared by `pg`.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;
mod wave_codec;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use pg::{
    build_dev_pool_from_env, build_pool, ConnectionProvider, PgAbortPollingGovernor, PgDriver, PgEventLog, PgLedger, PgPlanStore, PgPool,
    PgSerializationLock, PoolProvider,
};
