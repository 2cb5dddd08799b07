//! Append-only event log: the interface and an in-memory reference
//! implementation used by tests and by callers without a durable backend.

use std::collections::HashMap;

use chrono::Utc;

use super::types::{Event, EventBuilder, EventType};

pub trait EventLog {
    /// Appends `event`, assigning the next `seq` for its `plan_id` and the
    /// current timestamp, and returns the stored record.
    fn append(&mut self, event: EventBuilder) -> Event;

    /// Lists a plan's events in ascending `seq` order.
    fn list(&self, plan_id: &str) -> Vec<Event>;

    /// Lists events with `seq > since`, for tailing.
    fn tail(&self, plan_id: &str, since: u64) -> Vec<Event> {
        self.list(plan_id).into_iter().filter(|e| e.seq > since).collect()
    }
}

#[derive(Default)]
pub struct InMemoryEventLog {
    inner: HashMap<String, Vec<Event>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len_for(&self, plan_id: &str) -> usize {
        self.inner.get(plan_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&mut self, event: EventBuilder) -> Event {
        let (plan_id, event_type, wave_name, step_sha, payload) = event.finish();
        let log = self.inner.entry(plan_id.clone()).or_default();
        let seq = log.len() as u64;
        let ev = Event { seq, plan_id, event_type, ts: Utc::now(), wave_name, step_sha, payload };
        log.push(ev.clone());
        ev
    }

    fn list(&self, plan_id: &str) -> Vec<Event> {
        self.inner.get(plan_id).cloned().unwrap_or_default()
    }
}

/// Convenience shorthand for the common no-wave/no-step/no-payload case.
pub fn plain(plan_id: impl Into<String>, event_type: EventType) -> EventBuilder {
    Event::builder(plan_id, event_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_increments_per_plan() {
        let mut log = InMemoryEventLog::new();
        log.append(Event::builder("p1", EventType::PlanAnnotated));
        log.append(Event::builder("p1", EventType::PlanStart));
        log.append(Event::builder("p2", EventType::PlanAnnotated));

        let p1 = log.list("p1");
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[0].seq, 0);
        assert_eq!(p1[1].seq, 1);
        assert_eq!(log.list("p2")[0].seq, 0);
    }

    #[test]
    fn tail_filters_by_seq() {
        let mut log = InMemoryEventLog::new();
        log.append(Event::builder("p1", EventType::PlanAnnotated));
        log.append(Event::builder("p1", EventType::PlanStart));
        log.append(Event::builder("p1", EventType::PlanOk));

        let tailed = log.tail("p1", 0);
        assert_eq!(tailed.len(), 2);
        assert_eq!(tailed[0].seq, 1);
    }
}
