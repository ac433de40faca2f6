//! Listener registry and event dispatch

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::event::{Event, EventType, Payload};

/// Receiver of fired events
///
/// `notify` takes `&self`: listeners that accumulate state guard it with
/// interior mutability (typically a mutex, since listeners are shared
/// across threads).
pub trait EventListener: Send + Sync {
    /// Called for every fired event of a subscribed type
    fn notify(&self, event: &Event);
}

/// Per-type listener registry with weak references
///
/// Listeners are registered per [`EventType`] and held weakly: dropping the
/// last `Arc` to a listener unsubscribes it, and dead entries are pruned
/// during [`fire`](Self::fire). Registration of the same listener for the
/// same type is idempotent.
///
/// The registry lock is released before listeners run, so a listener may
/// safely subscribe or unsubscribe others from inside `notify`.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use statkit::event::{Event, EventListener, EventProducer, EventType};
///
/// const TICK: EventType = EventType::new("TICK");
///
/// #[derive(Default)]
/// struct Recorder {
///     seen: Mutex<Vec<f64>>,
/// }
///
/// impl EventListener for Recorder {
///     fn notify(&self, event: &Event) {
///         if let Some(v) = event.payload().as_f64() {
///             self.seen.lock().unwrap().push(v);
///         }
///     }
/// }
///
/// let producer = EventProducer::new();
/// let recorder = Arc::new(Recorder::default());
/// producer.add_listener(TICK, &recorder);
///
/// producer.fire_value(TICK, 42.0);
/// assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[42.0]);
/// ```
pub struct EventProducer {
    registry: Mutex<HashMap<EventType, Vec<Weak<dyn EventListener>>>>,
}

impl Default for EventProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock_registry();
        let mut dbg = f.debug_map();
        for (event_type, entries) in registry.iter() {
            let live = entries.iter().filter(|w| w.strong_count() > 0).count();
            dbg.entry(&event_type.name(), &live);
        }
        dbg.finish()
    }
}

impl EventProducer {
    /// Create a producer with no listeners
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
        }
    }

    fn lock_registry(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<EventType, Vec<Weak<dyn EventListener>>>> {
        // A panicking listener must not disable the registry
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe a listener to an event type
    ///
    /// Only a weak reference is kept; the caller keeps the listener alive.
    /// Re-adding the same listener for the same type is a no-op.
    pub fn add_listener<L>(&self, event_type: EventType, listener: &Arc<L>)
    where
        L: EventListener + 'static,
    {
        let listener: Arc<dyn EventListener> = listener.clone();
        let weak: Weak<dyn EventListener> = Arc::downgrade(&listener);
        let mut registry = self.lock_registry();
        let entries = registry.entry(event_type).or_default();
        if entries.iter().any(|existing| existing.ptr_eq(&weak)) {
            return;
        }
        entries.push(weak);
    }

    /// Unsubscribe a listener from an event type
    ///
    /// Returns `true` if the listener was subscribed.
    pub fn remove_listener<L>(&self, event_type: EventType, listener: &Arc<L>) -> bool
    where
        L: EventListener + 'static,
    {
        let listener: Arc<dyn EventListener> = listener.clone();
        let weak: Weak<dyn EventListener> = Arc::downgrade(&listener);
        let mut registry = self.lock_registry();
        match registry.get_mut(&event_type) {
            Some(entries) => {
                let was_subscribed = entries.iter().any(|existing| existing.ptr_eq(&weak));
                entries.retain(|existing| !existing.ptr_eq(&weak) && existing.strong_count() > 0);
                was_subscribed
            }
            None => false,
        }
    }

    /// Unsubscribe every listener from every event type
    pub fn remove_all_listeners(&self) {
        self.lock_registry().clear();
    }

    /// Fire an event to the live listeners of its type
    ///
    /// Listeners are notified in registration order; dead entries are
    /// pruned. Firing a type nobody subscribed to is a no-op.
    pub fn fire(&self, event: &Event) {
        let targets: Vec<Arc<dyn EventListener>> = {
            let mut registry = self.lock_registry();
            match registry.get_mut(&event.event_type()) {
                Some(entries) => {
                    let mut live = Vec::with_capacity(entries.len());
                    entries.retain(|weak| match weak.upgrade() {
                        Some(strong) => {
                            live.push(strong);
                            true
                        }
                        None => false,
                    });
                    live
                }
                None => Vec::new(),
            }
        };

        for listener in targets {
            listener.notify(event);
        }
    }

    /// Fire an event without content
    pub fn fire_event(&self, event_type: EventType) {
        self.fire(&Event::new(event_type));
    }

    /// Fire an event carrying a numeric payload
    pub fn fire_value(&self, event_type: EventType, value: f64) {
        self.fire(&Event::with_payload(event_type, Payload::Float(value)));
    }

    /// Number of live listeners subscribed to an event type
    pub fn listener_count(&self, event_type: EventType) -> usize {
        let registry = self.lock_registry();
        registry
            .get(&event_type)
            .map(|entries| entries.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Check whether any live listener is subscribed to any type
    pub fn has_listeners(&self) -> bool {
        let registry = self.lock_registry();
        registry
            .values()
            .any(|entries| entries.iter().any(|w| w.strong_count() > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PING: EventType = EventType::new("PING");
    const PONG: EventType = EventType::new("PONG");

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl EventListener for Recorder {
        fn notify(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_fire_and_receive() {
        let producer = EventProducer::new();
        let recorder = Arc::new(Recorder::default());
        producer.add_listener(PING, &recorder);

        producer.fire_value(PING, 1.5);
        producer.fire_event(PING);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].payload().as_f64(), Some(1.5));
        assert!(seen[1].payload().is_empty());
    }

    #[test]
    fn test_type_filtering() {
        let producer = EventProducer::new();
        let pings = Arc::new(Recorder::default());
        let pongs = Arc::new(Recorder::default());
        producer.add_listener(PING, &pings);
        producer.add_listener(PONG, &pongs);

        producer.fire_event(PING);
        producer.fire_event(PING);
        producer.fire_event(PONG);

        assert_eq!(pings.count(), 2);
        assert_eq!(pongs.count(), 1);
    }

    #[test]
    fn test_fire_without_listeners_is_noop() {
        let producer = EventProducer::new();
        producer.fire_event(PING);
        assert!(!producer.has_listeners());
    }

    #[test]
    fn test_add_is_idempotent() {
        let producer = EventProducer::new();
        let recorder = Arc::new(Recorder::default());
        producer.add_listener(PING, &recorder);
        producer.add_listener(PING, &recorder);

        producer.fire_event(PING);

        assert_eq!(recorder.count(), 1);
        assert_eq!(producer.listener_count(PING), 1);
    }

    #[test]
    fn test_remove_listener() {
        let producer = EventProducer::new();
        let recorder = Arc::new(Recorder::default());
        producer.add_listener(PING, &recorder);

        assert!(producer.remove_listener(PING, &recorder));
        assert!(!producer.remove_listener(PING, &recorder));

        producer.fire_event(PING);
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_dropped_listener_unsubscribes() {
        let producer = EventProducer::new();
        let recorder = Arc::new(Recorder::default());
        producer.add_listener(PING, &recorder);
        assert_eq!(producer.listener_count(PING), 1);

        drop(recorder);

        assert_eq!(producer.listener_count(PING), 0);
        assert!(!producer.has_listeners());
        // Firing prunes the dead entry without panicking
        producer.fire_event(PING);
    }

    #[test]
    fn test_remove_all_listeners() {
        let producer = EventProducer::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        producer.add_listener(PING, &a);
        producer.add_listener(PONG, &b);

        producer.remove_all_listeners();

        producer.fire_event(PING);
        producer.fire_event(PONG);
        assert_eq!(a.count(), 0);
        assert_eq!(b.count(), 0);
    }

    #[test]
    fn test_registration_order_preserved() {
        struct Tagger {
            tag: u8,
            log: Arc<Mutex<Vec<u8>>>,
        }

        impl EventListener for Tagger {
            fn notify(&self, _event: &Event) {
                self.log.lock().unwrap().push(self.tag);
            }
        }

        let producer = EventProducer::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(Tagger { tag: 1, log: log.clone() });
        let second = Arc::new(Tagger { tag: 2, log: log.clone() });
        producer.add_listener(PING, &first);
        producer.add_listener(PING, &second);

        producer.fire_event(PING);
        producer.fire_event(PING);

        assert_eq!(log.lock().unwrap().as_slice(), &[1, 2, 1, 2]);
    }
}
