//! Child-level event kinds usable with collection paths.

use std::fmt;

use typedtree_core::EventType;

/// The subset of [`EventType`] that makes sense on a collection.
///
/// A collection has no single replaceable value, so `EventType::Value` has
/// no counterpart here. `EventType::ChildMoved` is left out as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChildAdded,
    ChildChanged,
    ChildRemoved,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::ChildAdded,
        EventKind::ChildChanged,
        EventKind::ChildRemoved,
    ];

    /// The native notification kind requested from the store.
    pub fn event_type(self) -> EventType {
        match self {
            EventKind::ChildAdded => EventType::ChildAdded,
            EventKind::ChildChanged => EventType::ChildChanged,
            EventKind::ChildRemoved => EventType::ChildRemoved,
        }
    }
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        kind.event_type()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.event_type(), f)
    }
}
