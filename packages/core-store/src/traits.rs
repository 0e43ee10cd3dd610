//! The store collaborator interface.

use crate::{Error, EventType, Path, Snapshot, SubscriptionHandle, Value};

/// Callback for a single delivery.
pub type OnceCallback = Box<dyn FnOnce(Snapshot) + Send + 'static>;

/// Callback invoked for every delivery of a continuous observation.
pub type EventCallback = Box<dyn FnMut(Snapshot) + Send + 'static>;

/// A handle to one location in a realtime tree store.
///
/// References are cheap to clone and only address data; resolving a child
/// performs no I/O. Deliveries happen on whatever execution context the store
/// owns, so callbacks must be `Send`.
///
/// # Example
///
/// ```rust,ignore
/// use typedtree_core::{EventType, Reference};
///
/// fn watch_visits<R: Reference>(root: &R) {
///     let visits = root.child("counters/visits");
///     let handle = visits.observe(EventType::Value, Box::new(|snap| {
///         println!("{} = {:?}", snap.path, snap.value);
///     }));
///     root.remove_observer(handle);
/// }
/// ```
pub trait Reference: Clone + Send + Sync + 'static {
    /// A reference to the root of the store this reference belongs to.
    fn root(&self) -> Self;

    /// A reference to the location at `relative` below this one.
    ///
    /// `relative` is a slash-delimited path. Pure addressing: nothing is read
    /// or written.
    fn child(&self, relative: &str) -> Self;

    /// The absolute location this reference addresses.
    fn path(&self) -> &Path;

    /// The last key of the location, `None` for the root.
    fn key(&self) -> Option<&str> {
        self.path().key()
    }

    /// Request exactly one delivery of `event`.
    fn observe_once(&self, event: EventType, callback: OnceCallback);

    /// Register a continuous observation of `event`.
    ///
    /// The callback fires zero or more times until the returned handle is
    /// passed to [`Reference::remove_observer`].
    fn observe(&self, event: EventType, callback: EventCallback) -> SubscriptionHandle;

    /// Stop deliveries for a continuous observation.
    ///
    /// Unknown or already removed handles are ignored. A delivery already in
    /// flight may still land.
    fn remove_observer(&self, handle: SubscriptionHandle);

    /// Replace whatever is stored at this location with `value`.
    ///
    /// Writing `Value::Null` removes the location.
    fn set_value(&self, value: Value) -> Result<(), Error>;

    /// A reference to a new child with a store-generated unique key.
    fn child_by_auto_id(&self) -> Self;
}
