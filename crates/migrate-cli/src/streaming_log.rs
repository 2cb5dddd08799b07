//! Decorates an `EventLog` so `apply` can stream each event to stdout as
//! newline-delimited JSON the instant it's durably appended, while still
//! delegating the actual storage to the wrapped log.

use migrate_core::event::{Event, EventBuilder, EventLog};

pub struct StreamingEventLog<L> {
    inner: L,
}

impl<L: EventLog> StreamingEventLog<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: EventLog> EventLog for StreamingEventLog<L> {
    fn append(&mut self, event: EventBuilder) -> Event {
        let stored = self.inner.append(event);
        println!("{}", serde_json::to_string(&stored).expect("Event serializes"));
        stored
    }

    fn list(&self, plan_id: &str) -> Vec<Event> {
        self.inner.list(plan_id)
    }
}
