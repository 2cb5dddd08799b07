//! The Governor: a black-box `(Sample) -> Directive` function. Only the
//! interface and a minimal policy are fixed; richer signals are
//! implementation-defined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GovernorSample {
    pub active_connections: u32,
    pub recent_error_rate: f64,
    pub long_running_statements: u32,
    pub replication_lag_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    Proceed,
    Slow(f64),
    Pause(String),
    Abort(String),
}

pub trait Governor {
    fn sample(&mut self) -> GovernorSample;
    fn directive(&self, sample: &GovernorSample) -> Directive;
}

/// The minimal fixed policy: connection-count-driven slowdown,
/// error-rate-driven pause, everything else proceeds. An external-abort
/// flag is checked independently of the sample.
pub struct SimpleGovernor {
    pub max_active_connections: u32,
    pub max_error_rate: f64,
    sampler: Box<dyn FnMut() -> GovernorSample + Send>,
    external_abort: bool,
}

impl SimpleGovernor {
    pub fn new(sampler: Box<dyn FnMut() -> GovernorSample + Send>) -> Self {
        Self { max_active_connections: 80, max_error_rate: 0.05, sampler, external_abort: false }
    }

    pub fn request_external_abort(&mut self) {
        self.external_abort = true;
    }
}

impl Governor for SimpleGovernor {
    fn sample(&mut self) -> GovernorSample {
        (self.sampler)()
    }

    fn directive(&self, sample: &GovernorSample) -> Directive {
        if self.external_abort {
            return Directive::Abort("external".to_string());
        }
        if sample.recent_error_rate > self.max_error_rate {
            return Directive::Pause("error_rate".to_string());
        }
        if sample.active_connections > self.max_active_connections {
            return Directive::Slow(2.0);
        }
        Directive::Proceed
    }
}

/// A governor that always proceeds, for tests and for executors run
/// without a database-health signal source.
pub struct NullGovernor {
    external_abort: bool,
}

impl NullGovernor {
    pub fn new() -> Self {
        Self { external_abort: false }
    }

    pub fn request_external_abort(&mut self) {
        self.external_abort = true;
    }
}

impl Default for NullGovernor {
    fn default() -> Self {
        Self::new()
    }
}

impl Governor for NullGovernor {
    fn sample(&mut self) -> GovernorSample {
        GovernorSample { active_connections: 0, recent_error_rate: 0.0, long_running_statements: 0, replication_lag_ms: None }
    }

    fn directive(&self, _sample: &GovernorSample) -> Directive {
        if self.external_abort {
            Directive::Abort("external".to_string())
        } else {
            Directive::Proceed
        }
    }
}

pub fn timestamped_payload(sample: &GovernorSample, ts: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "active_connections": sample.active_connections,
        "recent_error_rate": sample.recent_error_rate,
        "long_running_statements": sample.long_running_statements,
        "replication_lag_ms": sample.replication_lag_ms,
        "ts": ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_connection_count_slows_down() {
        let gov = SimpleGovernor::new(Box::new(|| GovernorSample {
            active_connections: 200,
            recent_error_rate: 0.0,
            long_running_statements: 0,
            replication_lag_ms: None,
        }));
        let sample = GovernorSample { active_connections: 200, recent_error_rate: 0.0, long_running_statements: 0, replication_lag_ms: None };
        assert_eq!(gov.directive(&sample), Directive::Slow(2.0));
    }

    #[test]
    fn high_error_rate_pauses() {
        let gov = SimpleGovernor::new(Box::new(|| GovernorSample {
            active_connections: 1,
            recent_error_rate: 0.5,
            long_running_statements: 0,
            replication_lag_ms: None,
        }));
        let sample = GovernorSample { active_connections: 1, recent_error_rate: 0.5, long_running_statements: 0, replication_lag_ms: None };
        assert_eq!(gov.directive(&sample), Directive::Pause("error_rate".to_string()));
    }

    #[test]
    fn external_abort_takes_priority() {
        let mut gov = SimpleGovernor::new(Box::new(|| GovernorSample {
            active_connections: 1,
            recent_error_rate: 0.0,
            long_running_statements: 0,
            replication_lag_ms: None,
        }));
        gov.request_external_abort();
        let sample = gov.sample();
        assert_eq!(gov.directive(&sample), Directive::Abort("external".to_string()));
    }
}
