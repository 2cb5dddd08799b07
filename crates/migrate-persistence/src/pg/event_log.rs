//! Postgres-backed `EventLog`: append-only, `(plan_id, seq)` ordered.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use migrate_core::event::{Event, EventBuilder, EventLog, EventType};

use crate::error::PersistenceError;
use crate::schema::events;
use crate::wave_codec::{wave_from_text, wave_to_text};

use super::{with_retry, ConnectionProvider};

#[derive(Queryable, Debug)]
struct EventRow {
    plan_id: String,
    seq: i64,
    ts: DateTime<Utc>,
    event_type: String,
    wave_name: Option<String>,
    step_sha: Option<String>,
    payload: Value,
}

impl EventRow {
    fn into_event(self) -> Event {
        Event {
            seq: self.seq as u64,
            plan_id: self.plan_id,
            event_type: event_type_from_text(&self.event_type),
            ts: self.ts,
            wave_name: self.wave_name.map(|w| wave_from_text(&w).expect("wave_name column holds a canonical phase")),
            step_sha: self.step_sha,
            payload: self.payload,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewEventRow<'a> {
    plan_id: &'a str,
    seq: i64,
    event_type: &'static str,
    wave_name: Option<&'static str>,
    step_sha: Option<&'a str>,
    payload: &'a Value,
}

fn event_type_to_text(event_type: EventType) -> &'static str {
    match event_type {
        EventType::PlanAnnotated => "plan.annotated",
        EventType::PlanStart => "plan.start",
        EventType::PlanOk => "plan.ok",
        EventType::PlanFail => "plan.fail",
        EventType::PlanAbort => "plan.abort",
        EventType::WaveStart => "wave.start",
        EventType::WaveOk => "wave.ok",
        EventType::WaveFail => "wave.fail",
        EventType::StepStart => "step.start",
        EventType::StepOk => "step.ok",
        EventType::StepSkip => "step.skip",
        EventType::StepFail => "step.fail",
        EventType::GovernorSample => "governor.sample",
        EventType::GovernorDirective => "governor.directive",
        EventType::LedgerBegin => "ledger.begin",
        EventType::LedgerFinalize => "ledger.finalize",
    }
}

fn event_type_from_text(text: &str) -> EventType {
    match text {
        "plan.annotated" => EventType::PlanAnnotated,
        "plan.start" => EventType::PlanStart,
        "plan.ok" => EventType::PlanOk,
        "plan.fail" => EventType::PlanFail,
        "plan.abort" => EventType::PlanAbort,
        "wave.start" => EventType::WaveStart,
        "wave.ok" => EventType::WaveOk,
        "wave.fail" => EventType::WaveFail,
        "step.start" => EventType::StepStart,
        "step.ok" => EventType::StepOk,
        "step.skip" => EventType::StepSkip,
        "step.fail" => EventType::StepFail,
        "governor.sample" => EventType::GovernorSample,
        "governor.directive" => EventType::GovernorDirective,
        "ledger.begin" => EventType::LedgerBegin,
        "ledger.finalize" => EventType::LedgerFinalize,
        other => panic!("unknown event_type column value: {other}"),
    }
}

/// Durable `EventLog` over an `events` table keyed by `(plan_id, seq)`.
/// `seq` is assigned here, not by the database, so it stays a plain
/// application-level counter rather than depending on a sequence object
/// per plan.
pub struct PgEventLog<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgEventLog<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn next_seq(&self, plan_id: &str) -> i64 {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let max: Option<i64> =
                events::table.filter(events::plan_id.eq(plan_id)).select(diesel::dsl::max(events::seq)).first(&mut conn).map_err(PersistenceError::from)?;
            Ok(max.map(|m| m + 1).unwrap_or(0))
        })
        .unwrap_or_else(|e| panic!("next_seq for plan {plan_id}: {e}"))
    }
}

impl<P: ConnectionProvider> EventLog for PgEventLog<P> {
    fn append(&mut self, event: EventBuilder) -> Event {
        let (plan_id, event_type, wave_name, step_sha, payload) = event.finish();
        let seq = self.next_seq(&plan_id);
        let row = NewEventRow {
            plan_id: &plan_id,
            seq,
            event_type: event_type_to_text(event_type),
            wave_name: wave_name.map(wave_to_text),
            step_sha: step_sha.as_deref(),
            payload: &payload,
        };
        let ts: DateTime<Utc> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(events::table).values(&row).returning(events::ts).get_result(&mut conn).map_err(PersistenceError::from)
        })
        .unwrap_or_else(|e| panic!("event append for plan {plan_id} seq {seq}: {e}"));

        Event { seq: seq as u64, plan_id, event_type, ts, wave_name, step_sha, payload }
    }

    fn list(&self, plan_id: &str) -> Vec<Event> {
        let rows: Vec<EventRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            events::table.filter(events::plan_id.eq(plan_id)).order(events::seq.asc()).load(&mut conn).map_err(PersistenceError::from)
        })
        .unwrap_or_else(|e| panic!("event list for plan {plan_id}: {e}"));

        rows.into_iter().map(EventRow::into_event).collect()
    }
}
