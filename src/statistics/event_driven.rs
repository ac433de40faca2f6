//! Event-driven statistics
//!
//! Bridges between the accumulators and the observer primitives:
//! [`EventTally`] notifies listeners of accepted observations, and
//! [`ListeningTally`] accumulates observations delivered as events.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::event::{Event, EventListener, EventProducer, EventType, Payload};
use crate::statistics::Tally;
use crate::traits::Accumulator;

/// Fired by [`EventTally`] for every accepted observation; payload is the value
pub const OBSERVATION_ADDED: EventType = EventType::new("OBSERVATION_ADDED");

/// Fired by [`EventTally`] when it is reset
pub const INITIALIZED: EventType = EventType::new("INITIALIZED");

/// A tally that notifies listeners of its observations
///
/// Wraps a [`Tally`] and an [`EventProducer`]. Every accepted observation
/// fires [`OBSERVATION_ADDED`] with the value as payload; a reset fires
/// [`INITIALIZED`]. Ignored observations (NaN) fire nothing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use statkit::statistics::{EventTally, ListeningTally, OBSERVATION_ADDED};
///
/// let mut source = EventTally::new("queue-length");
/// let mirror = Arc::new(ListeningTally::new());
/// source.producer().add_listener(OBSERVATION_ADDED, &mirror);
///
/// source.add(3.0);
/// source.add(5.0);
///
/// assert_eq!(mirror.len(), 2);
/// assert!((mirror.snapshot().mean() - 4.0).abs() < 1e-12);
/// ```
pub struct EventTally {
    id: String,
    tally: Tally,
    producer: EventProducer,
}

impl fmt::Debug for EventTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTally")
            .field("id", &self.id)
            .field("tally", &self.tally)
            .field("producer", &self.producer)
            .finish()
    }
}

impl EventTally {
    /// Create an empty event-producing tally with an identifier
    ///
    /// The identifier becomes the source id of every fired event.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tally: Tally::new(),
            producer: EventProducer::new(),
        }
    }

    /// Get the identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the producer, to subscribe or unsubscribe listeners
    pub fn producer(&self) -> &EventProducer {
        &self.producer
    }

    /// Get read access to the underlying tally
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Register an observation and notify listeners
    pub fn add(&mut self, value: f64) {
        let before = self.tally.len();
        self.tally.add(value);
        if self.tally.len() > before {
            self.producer.fire(
                &Event::with_payload(OBSERVATION_ADDED, Payload::Float(value))
                    .source_id(self.id.clone()),
            );
        }
    }

    /// Reset the tally and notify listeners
    pub fn reset(&mut self) {
        self.tally.reset();
        self.producer
            .fire(&Event::new(INITIALIZED).source_id(self.id.clone()));
    }
}

/// A listener that accumulates numeric event payloads into a tally
///
/// The inner [`Tally`] is guarded by a mutex, since `notify` runs with a
/// shared reference and events may arrive from several threads. Events
/// without a numeric payload are ignored.
#[derive(Debug, Default)]
pub struct ListeningTally {
    tally: Mutex<Tally>,
}

impl ListeningTally {
    /// Create an empty listening tally
    pub fn new() -> Self {
        Self {
            tally: Mutex::new(Tally::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a snapshot of the accumulated statistics
    pub fn snapshot(&self) -> Tally {
        self.lock().clone()
    }

    /// Get the number of accumulated observations
    pub fn len(&self) -> u64 {
        self.lock().len()
    }

    /// Check if no observation has arrived yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset the accumulated statistics
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Convenience constructor returning the listener ready to subscribe
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl EventListener for ListeningTally {
    fn notify(&self, event: &Event) {
        if let Some(value) = event.payload().as_f64() {
            self.lock().add(value);
        }
    }
}
