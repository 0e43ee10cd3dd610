//! Change notifications: what a store delivers to observers.

use std::fmt;

use crate::{Path, Value};

/// The store's native notification vocabulary.
///
/// `Value` reports the whole value at the observed location; the `Child*`
/// kinds report one direct child of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The entire value at the location was replaced or first read.
    Value,
    /// A direct child appeared.
    ChildAdded,
    /// A direct child's value changed.
    ChildChanged,
    /// A direct child was removed.
    ChildRemoved,
    /// A direct child changed position among its siblings.
    ChildMoved,
}

impl EventType {
    /// Whether this kind describes a single child rather than the whole node.
    pub fn is_child_event(self) -> bool {
        !matches!(self, EventType::Value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Value => "value",
            EventType::ChildAdded => "child_added",
            EventType::ChildChanged => "child_changed",
            EventType::ChildRemoved => "child_removed",
            EventType::ChildMoved => "child_moved",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw data delivered for one notification.
///
/// For `Value` events the snapshot describes the observed location; for child
/// events it describes the child. A location holding nothing is delivered as
/// `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: Path,
    pub value: Value,
}

impl Snapshot {
    pub fn new(path: Path, value: Value) -> Self {
        Self { path, value }
    }

    /// The last key of the snapshot's location, `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    /// Whether anything is stored at the location.
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }
}

/// Opaque token identifying one continuous observation.
///
/// Returned by `Reference::observe`; pass it back to
/// `Reference::remove_observer` to stop deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wrap a store-assigned identifier.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription#{}", self.0)
    }
}
