//! Event vocabulary and the `Event` record shape.
//!
//! The vocabulary is exhaustive per the executor's contract: any lifecycle
//! observation an external consumer can see maps to exactly one of these
//! variants, serialized under its dotted name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::WavePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "plan.annotated")]
    PlanAnnotated,
    #[serde(rename = "plan.start")]
    PlanStart,
    #[serde(rename = "plan.ok")]
    PlanOk,
    #[serde(rename = "plan.fail")]
    PlanFail,
    #[serde(rename = "plan.abort")]
    PlanAbort,
    #[serde(rename = "wave.start")]
    WaveStart,
    #[serde(rename = "wave.ok")]
    WaveOk,
    #[serde(rename = "wave.fail")]
    WaveFail,
    #[serde(rename = "step.start")]
    StepStart,
    #[serde(rename = "step.ok")]
    StepOk,
    #[serde(rename = "step.skip")]
    StepSkip,
    #[serde(rename = "step.fail")]
    StepFail,
    #[serde(rename = "governor.sample")]
    GovernorSample,
    #[serde(rename = "governor.directive")]
    GovernorDirective,
    #[serde(rename = "ledger.begin")]
    LedgerBegin,
    #[serde(rename = "ledger.finalize")]
    LedgerFinalize,
}

/// One observation of executor behavior. `seq` is assigned by the
/// `EventLog` on append and is monotonically increasing within a
/// `plan_id` — it is never part of any hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub plan_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub ts: DateTime<Utc>,
    pub wave_name: Option<WavePhase>,
    pub step_sha: Option<String>,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn builder(plan_id: impl Into<String>, event_type: EventType) -> EventBuilder {
        EventBuilder {
            plan_id: plan_id.into(),
            event_type,
            wave_name: None,
            step_sha: None,
            payload: serde_json::Value::Null,
        }
    }
}

/// Convenience builder so call sites don't repeat `None`/`Value::Null` for
/// the common case of an event with no wave/step context.
pub struct EventBuilder {
    plan_id: String,
    event_type: EventType,
    wave_name: Option<WavePhase>,
    step_sha: Option<String>,
    payload: serde_json::Value,
}

impl EventBuilder {
    pub fn wave(mut self, wave_name: WavePhase) -> Self {
        self.wave_name = Some(wave_name);
        self
    }

    pub fn step(mut self, step_sha: impl Into<String>) -> Self {
        self.step_sha = Some(step_sha.into());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Builds the event without `seq`/`ts`; those are assigned by the
    /// `EventLog` on append.
    pub fn finish(self) -> (String, EventType, Option<WavePhase>, Option<String>, serde_json::Value) {
        (self.plan_id, self.event_type, self.wave_name, self.step_sha, self.payload)
    }
}
