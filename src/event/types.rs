//! Event vocabulary: types, payloads, and the event value itself

use std::fmt;

/// Identity of a kind of event
///
/// Producers declare the event types they fire as `pub const`s; listeners
/// subscribe per type. Two event types are equal when their names are equal.
///
/// # Example
///
/// ```
/// use statkit::event::EventType;
///
/// pub const VALUE_CHANGED: EventType = EventType::new("VALUE_CHANGED");
///
/// assert_eq!(VALUE_CHANGED.name(), "VALUE_CHANGED");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    name: &'static str,
}

impl EventType {
    /// Declare an event type with the given name
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Get the event type's name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Content carried by an event
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// No content
    Empty,
    /// Boolean content
    Bool(bool),
    /// Integer content
    Integer(i64),
    /// Floating-point content
    Float(f64),
    /// Text content
    Text(String),
    /// A list of payloads
    List(Vec<Payload>),
}

impl Payload {
    /// Check if the payload carries no content
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Get the boolean content, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer content, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Payload::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the numeric content, if any
    ///
    /// Integer payloads are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Float(v) => Some(*v),
            Payload::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the text content, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list content, if any
    pub fn as_list(&self) -> Option<&[Payload]> {
        match self {
            Payload::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A fired notification: an event type plus its payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: EventType,
    payload: Payload,
    source_id: Option<String>,
}

impl Event {
    /// Create an event without content
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            payload: Payload::Empty,
            source_id: None,
        }
    }

    /// Create an event with a payload
    pub fn with_payload(event_type: EventType, payload: Payload) -> Self {
        Self {
            event_type,
            payload,
            source_id: None,
        }
    }

    /// Attach an identifier of the producing object
    pub fn source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// Get the event type
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Get the payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Get the source identifier, if any
    pub fn source(&self) -> Option<&str> {
        self.source_id.as_deref()
    }
}
