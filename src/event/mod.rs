//! Observer primitives for change notification
//!
//! This module provides the pub/sub vocabulary used throughout the crate:
//! producers declare [`EventType`]s, fire [`Event`]s through an
//! [`EventProducer`], and [`EventListener`]s receive the ones they
//! subscribed to.
//!
//! Listeners are held by weak reference, so dropping a listener's last
//! `Arc` unsubscribes it automatically.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use statkit::event::{Event, EventListener, EventProducer, EventType, Payload};
//!
//! const LEVEL_CHANGED: EventType = EventType::new("LEVEL_CHANGED");
//!
//! #[derive(Default)]
//! struct Gauge {
//!     level: Mutex<f64>,
//! }
//!
//! impl EventListener for Gauge {
//!     fn notify(&self, event: &Event) {
//!         if let Some(v) = event.payload().as_f64() {
//!             *self.level.lock().unwrap() = v;
//!         }
//!     }
//! }
//!
//! let producer = EventProducer::new();
//! let gauge = Arc::new(Gauge::default());
//! producer.add_listener(LEVEL_CHANGED, &gauge);
//!
//! producer.fire(&Event::with_payload(LEVEL_CHANGED, Payload::Float(0.75)));
//! assert_eq!(*gauge.level.lock().unwrap(), 0.75);
//! ```

mod producer;
mod types;

pub use producer::{EventListener, EventProducer};
pub use types::{Event, EventType, Payload};
