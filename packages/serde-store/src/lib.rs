//! Typed access to a realtime tree store via serde
//!
//! This layer binds locations to Rust types. It adds:
//! - `TypedPath<T>` / `CollectionPath<T>`: paths that carry their value type
//! - `EventKind`: the child-level events legal on a collection
//! - `DecodeResult<T>`: explicit success/failure of decoding a delivery
//! - `Service`: typed observe / set / add over any `Reference`
//! - Value <-> serde conversions
//!
//! # Example
//!
//! ```rust,ignore
//! use typedtree_serde::{CollectionPath, EventKind, Service, TypedPath};
//!
//! let service = Service::new(database.reference());
//!
//! let visits: TypedPath<i64> = TypedPath::parse("counters/visits")?;
//! service.set_value(&visits, &42)?;
//!
//! let messages: CollectionPath<String> = CollectionPath::parse("messages")?;
//! service.observe_collection(EventKind::ChildAdded, &messages, |message| {
//!     println!("new message: {:?}", message);
//! });
//! service.add_value(&messages, &"hi".to_string())?;
//! ```
//!
//! # Async Support
//!
//! Enable the `async` feature for futures and streams over the same
//! operations:
//!
//! ```toml
//! [dependencies]
//! typedtree-serde = { version = "0.1", features = ["async"] }
//! ```
//!
//! Then use `Service::value_once`, `Service::value_stream` and
//! `Service::collection_stream`.

mod convert;
mod decode;
mod error;
mod event_kind;
mod service;
mod typed_path;

pub use convert::{from_value, json_to_value, to_value, value_to_json};
pub use decode::{decode, DecodeResult};
pub use error::{DecodeError, EncodeError, WriteError};
pub use event_kind::EventKind;
pub use service::Service;
pub use typed_path::{CollectionPath, CollectionPathType, PathType, TypedPath};

// Re-export core types for convenience
pub use typedtree_core::{
    path, Error, EventType, Path, PathError, Reference, Snapshot, SubscriptionHandle, Value,
};

// Async support
#[cfg(feature = "async")]
mod async_service;

#[cfg(feature = "async")]
pub use async_service::DecodeStream;
