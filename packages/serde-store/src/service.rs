//! The typed facade over a store reference.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use typedtree_core::{
    EventCallback, EventType, OnceCallback, Reference, Snapshot, SubscriptionHandle, Value,
};

use crate::convert::to_value;
use crate::decode::{decode, DecodeResult};
use crate::error::{EncodeError, WriteError};
use crate::event_kind::EventKind;
use crate::typed_path::{CollectionPathType, PathType, TypedPath};

/// Typed reads and writes against one store.
///
/// Every operation takes a [`PathType`] or [`CollectionPathType`] and uses its
/// `Element` as the value type, so a mismatched value, or a whole-value
/// observation of a collection, is rejected by the compiler.
///
/// The service holds nothing but the store's root reference. Subscriptions
/// belong to the caller, who cancels them with [`Service::remove_observer`].
///
/// # Example
///
/// ```rust,ignore
/// let service = Service::new(database.reference());
/// let visits: TypedPath<i64> = TypedPath::parse("counters/visits")?;
///
/// service.set_value(&visits, &42)?;
/// service.observe_once(&visits, |result| {
///     assert_eq!(result.ok(), Some(42));
/// });
/// ```
#[derive(Clone)]
pub struct Service<R: Reference> {
    root: R,
}

impl<R: Reference> Service<R> {
    /// Create a service over the store `reference` belongs to.
    ///
    /// Any reference works; the service resolves and keeps its root.
    pub fn new(reference: R) -> Self {
        Self {
            root: reference.root(),
        }
    }

    /// The root reference all paths are resolved against.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// The raw reference at a rendered location.
    pub fn reference(&self, rendered: &str) -> R {
        self.root.child(rendered)
    }

    // === Observing paths ===

    /// Deliver the value at `path` exactly once.
    pub fn observe_once<P, F>(&self, path: &P, callback: F)
    where
        P: PathType,
        P::Element: DeserializeOwned + 'static,
        F: FnOnce(DecodeResult<P::Element>) + Send + 'static,
    {
        let rendered = path.rendered();
        debug!(path = %rendered, "observing value once");
        self.reference(&rendered)
            .observe_once(EventType::Value, decoding_once::<P::Element, _>(callback));
    }

    /// Deliver the value at `path` now and after every change.
    ///
    /// Each delivery is decoded on its own; a failed decode is handed to the
    /// callback and the subscription stays active.
    pub fn observe<P, F>(&self, path: &P, callback: F) -> SubscriptionHandle
    where
        P: PathType,
        P::Element: DeserializeOwned + 'static,
        F: FnMut(DecodeResult<P::Element>) + Send + 'static,
    {
        let rendered = path.rendered();
        let handle = self
            .reference(&rendered)
            .observe(EventType::Value, decoding_each::<P::Element, _>(callback));
        debug!(path = %rendered, %handle, "observing value");
        handle
    }

    // === Observing collection paths ===

    /// Deliver one child-level event of `kind` under `path`.
    pub fn observe_collection_once<C, F>(&self, kind: EventKind, path: &C, callback: F)
    where
        C: CollectionPathType,
        C::Element: DeserializeOwned + 'static,
        F: FnOnce(DecodeResult<C::Element>) + Send + 'static,
    {
        let rendered = path.rendered();
        debug!(path = %rendered, %kind, "observing collection once");
        self.reference(&rendered)
            .observe_once(kind.event_type(), decoding_once::<C::Element, _>(callback));
    }

    /// Deliver every child-level event of `kind` under `path`.
    pub fn observe_collection<C, F>(
        &self,
        kind: EventKind,
        path: &C,
        callback: F,
    ) -> SubscriptionHandle
    where
        C: CollectionPathType,
        C::Element: DeserializeOwned + 'static,
        F: FnMut(DecodeResult<C::Element>) + Send + 'static,
    {
        let rendered = path.rendered();
        let handle = self
            .reference(&rendered)
            .observe(kind.event_type(), decoding_each::<C::Element, _>(callback));
        debug!(path = %rendered, %kind, %handle, "observing collection");
        handle
    }

    /// Stop a subscription started by `observe` or `observe_collection`.
    pub fn remove_observer(&self, handle: SubscriptionHandle) {
        debug!(%handle, "removing observer");
        self.root.remove_observer(handle);
    }

    // === Adding and setting ===

    /// Replace the value at `path` with `value`.
    ///
    /// Encoding happens first; if it fails the store is never contacted.
    pub fn set_value<P>(&self, path: &P, value: &P::Element) -> Result<(), WriteError>
    where
        P: PathType,
        P::Element: Serialize,
    {
        let rendered = path.rendered();
        let encoded = encode(&rendered, value)?;
        write(&self.reference(&rendered), rendered, encoded)
    }

    /// Append `value` under `path` at a store-generated key.
    pub fn add_value<C>(&self, path: &C, value: &C::Element) -> Result<(), WriteError>
    where
        C: CollectionPathType,
        C::Element: Serialize,
    {
        self.add_value_keyed(path, value).map(|_| ())
    }

    /// Like [`Service::add_value`], returning the path of the new child.
    pub fn add_value_keyed<C>(
        &self,
        path: &C,
        value: &C::Element,
    ) -> Result<TypedPath<C::Element>, WriteError>
    where
        C: CollectionPathType,
        C::Element: Serialize,
    {
        let rendered = path.rendered();
        let encoded = encode(&rendered, value)?;
        let child = self.reference(&rendered).child_by_auto_id();
        let child_path = child.path().clone();
        write(&child, child_path.to_string(), encoded)?;
        Ok(TypedPath::new(child_path))
    }
}

fn encode<T: Serialize + ?Sized>(
    rendered: &str,
    value: &T,
) -> Result<Value, EncodeError> {
    to_value(value).map_err(|e| {
        debug!(path = %rendered, error = %e, "encode failed");
        EncodeError {
            path: rendered.to_string(),
            message: e.to_string(),
        }
    })
}

fn write<R: Reference>(
    reference: &R,
    rendered: String,
    value: Value,
) -> Result<(), WriteError> {
    debug!(path = %rendered, kind = value.kind(), "writing value");
    reference.set_value(value).map_err(|source| {
        debug!(path = %rendered, error = %source, "store rejected write");
        WriteError::Store {
            path: rendered,
            source,
        }
    })
}

fn decode_delivery<T: DeserializeOwned>(snapshot: Snapshot) -> DecodeResult<T> {
    let result = decode(snapshot);
    if let DecodeResult::Failed(e) = &result {
        warn!(
            path = %e.path,
            expected = e.expected,
            found = e.found,
            error = %e.message,
            "delivery did not decode"
        );
    }
    result
}

fn decoding_once<T, F>(callback: F) -> OnceCallback
where
    T: DeserializeOwned + 'static,
    F: FnOnce(DecodeResult<T>) + Send + 'static,
{
    Box::new(move |snapshot| callback(decode_delivery(snapshot)))
}

fn decoding_each<T, F>(mut callback: F) -> EventCallback
where
    T: DeserializeOwned + 'static,
    F: FnMut(DecodeResult<T>) + Send + 'static,
{
    Box::new(move |snapshot| callback(decode_delivery(snapshot)))
}
