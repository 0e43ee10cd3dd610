//! typedtree: typed paths over a hierarchical realtime key-value store.
//!
//! Declare once that a location always holds a `T`, then read, observe and
//! write it without touching untyped values:
//!
//! - [`TypedPath<T>`]: a location holding one `T`
//! - [`CollectionPath<T>`]: a location whose children are each a `T`
//! - [`Service`]: typed observe / set / add over any [`Reference`]
//! - [`DecodeResult<T>`]: what every delivery hands back, success or failure
//! - [`MemoryDatabase`]: an in-memory realtime store to run it all against
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use typedtree::{CollectionPath, EventKind, MemoryDatabase, Service, TypedPath};
//!
//! let db = MemoryDatabase::new();
//! let service = Service::new(db.reference());
//!
//! let visits: TypedPath<i64> = TypedPath::parse("counters/visits").unwrap();
//! service.set_value(&visits, &42).unwrap();
//! service.observe_once(&visits, |result| assert_eq!(result.ok(), Some(42)));
//!
//! let messages: CollectionPath<String> = CollectionPath::parse("messages").unwrap();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! service.observe_collection(EventKind::ChildAdded, &messages, move |result| {
//!     sink.lock().unwrap().push(result.ok());
//! });
//! service.add_value(&messages, &"hi".to_string()).unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![Some("hi".to_string())]);
//! ```
//!
//! # Type checking
//!
//! A value of the wrong type does not compile:
//!
//! ```rust,compile_fail
//! use typedtree::{MemoryDatabase, Service, TypedPath};
//!
//! let service = Service::new(MemoryDatabase::new().reference());
//! let visits: TypedPath<i64> = TypedPath::parse("counters/visits").unwrap();
//! service.set_value(&visits, &"forty-two".to_string()).unwrap();
//! ```
//!
//! Nor does observing a collection as a whole value:
//!
//! ```rust,compile_fail
//! use typedtree::{CollectionPath, MemoryDatabase, Service};
//!
//! let service = Service::new(MemoryDatabase::new().reference());
//! let messages: CollectionPath<String> = CollectionPath::parse("messages").unwrap();
//! service.observe_once(&messages, |_| {});
//! ```
//!
//! # Layers
//!
//! - `typedtree-core`: untyped `Path`, `Value`, events and the `Reference` trait
//! - `typedtree-serde`: the typed layer built on serde
//! - `typedtree-memory`: the in-memory store
//!
//! The `async` feature adds futures and streams to [`Service`].

pub use typedtree_core::{
    path, Error, EventCallback, EventType, OnceCallback, Path, PathError, Reference, Snapshot,
    SubscriptionHandle, Value, MAX_KEY_BYTES,
};

pub use typedtree_serde::{
    decode, from_value, json_to_value, to_value, value_to_json, CollectionPath,
    CollectionPathType, DecodeError, DecodeResult, EncodeError, EventKind, PathType, Service,
    TypedPath, WriteError,
};

#[cfg(feature = "async")]
pub use typedtree_serde::DecodeStream;

pub use typedtree_memory::{
    DispatchMode, MemoryDatabase, MemoryReference, PushIdGenerator, StoreConfig,
};
