//! Event vocabulary and the `EventLog` trait.

mod store;
mod types;

pub use store::{plain, EventLog, InMemoryEventLog};
pub use types::{Event, EventBuilder, EventType};
