//! Executor configuration: a single value constructed once at startup and
//! passed into the executor by value, replacing global mutable
//! thresholds.

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Whether a step previously recorded `Failed` in the ledger may be
    /// re-attempted. The source prototype implies "no" but never enforces
    /// it; this config makes the choice explicit and defaults to it.
    pub retry_failed: bool,
    /// Upper bound on cumulative governor `pause` backoff before the
    /// executor escalates to `abort("governor_pause_cap")`.
    pub governor_pause_cap_ms: u64,
    /// Mandatory settle delay observed between waves.
    pub wave_settle_ms: u64,
    /// Base inter-step delay. A governor `Slow(factor)` directive multiplies
    /// this by `factor` before sleeping; zero means slowdown is a no-op.
    pub base_step_delay_ms: u64,
    /// Budget for acquiring the serialization lock before failing fast
    /// with `LockUnavailable`.
    pub lock_acquire_timeout_ms: u64,
    /// Identity recorded against every ledger row and event this executor
    /// writes.
    pub applied_by: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_failed: false,
            governor_pause_cap_ms: 30_000,
            wave_settle_ms: 0,
            base_step_delay_ms: 0,
            lock_acquire_timeout_ms: 5_000,
            applied_by: "migrate-exec".to_string(),
        }
    }
}
