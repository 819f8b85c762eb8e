/*!
 * Event Collector
 * Bounded in-memory stream of guard lifecycle events
 */

use super::events::{Event, EventKind, Severity};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};
use uuid::Uuid;

/// Default number of events kept before the oldest are evicted
pub const DEFAULT_CAPACITY: usize = 1024;

/// Bounded event collector
///
/// Keeps the most recent `capacity` events in a ring that overwrites its
/// oldest entry when full. Every emitted event is also forwarded to
/// `tracing`.
pub struct Collector {
    events: Mutex<HeapRb<Event>>,
    sequence: AtomicU64,
    evicted: AtomicU64,
}

impl Collector {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(HeapRb::new(capacity)),
            sequence: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Record an event, evicting the oldest when full
    pub fn emit(&self, mut event: Event) {
        event.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        if event.severity >= Severity::Error {
            error!(
                guard_id = %event.guard_id,
                resource_type = %event.resource_type,
                kind = ?event.kind,
                detail = event.detail.as_deref().unwrap_or(""),
                "guard event"
            );
        } else {
            debug!(
                guard_id = %event.guard_id,
                resource_type = %event.resource_type,
                kind = ?event.kind,
                detail = event.detail.as_deref().unwrap_or(""),
                "guard event"
            );
        }

        if self.events.lock().push_overwrite(event).is_some() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of retained events, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().cloned().collect()
    }

    /// Remove and return all retained events
    pub fn drain(&self) -> Vec<Event> {
        self.events.lock().pop_iter().collect()
    }

    /// Lifecycle kinds recorded for one guard, in order
    pub fn kinds_for(&self, guard_id: Uuid) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.guard_id == guard_id)
            .map(|e| e.kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.events.lock().capacity().get()
    }

    /// Number of events dropped to stay within capacity
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Serialize retained events as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        let events = self.events();
        serde_json::to_string(&events)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
