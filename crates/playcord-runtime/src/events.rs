use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use playcord_core::ActivityKind;
use playcord_parse::ContentKind;

use crate::connection::ConnectionPhase;

/// Maximum number of events retained in the ring buffer.
const EVENT_LOG_CAPACITY: usize = 200;

/// A typed event from the sync pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    StatusFetched {
        title: Option<String>,
        playing: bool,
    },
    Classified {
        raw_title: String,
        kind: ContentKind,
    },
    PresenceUpdated {
        title_line: String,
        activity: ActivityKind,
    },
    PresenceCleared {
        reason: String,
    },
    ConnectionChanged {
        phase: ConnectionPhase,
        attempts: u32,
    },
    Error {
        source: String,
        message: String,
    },
}

/// A timestamped event entry.
pub type EventEntry = (DateTime<Utc>, SyncEvent);

/// Bounded ring buffer of sync events.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Push a new event, evicting the oldest if at capacity.
    pub fn push(&mut self, event: SyncEvent) {
        if self.entries.len() >= EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((Utc::now(), event));
    }

    /// Return a snapshot of all entries (newest last).
    pub fn snapshot(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// Thread-safe handle to the event log.
pub type SharedEventLog = Arc<Mutex<EventLog>>;

/// Create a new shared event log.
pub fn shared_event_log() -> SharedEventLog {
    Arc::new(Mutex::new(EventLog::new()))
}

/// Record an event; a poisoned log is skipped.
pub fn record(log: &SharedEventLog, event: SyncEvent) {
    if let Ok(mut log) = log.lock() {
        log.push(event);
    }
}
