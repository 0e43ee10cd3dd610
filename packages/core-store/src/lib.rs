//! Core typedtree: the untyped store layer
//!
//! This layer describes the realtime tree store the typed layers sit on:
//! - `Path`: Validated slash-delimited location of database keys
//! - `Value`: The tree stored at every location
//! - `EventType` / `Snapshot`: What the store delivers to observers
//! - `Reference`: The collaborator trait a concrete store implements
//!
//! Nothing here knows about Rust types beyond `Value`; see
//! `typedtree-serde` for typed paths and decoding.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use typedtree_core::{path, Value};
//!
//! let mut counters = BTreeMap::new();
//! counters.insert("visits".to_string(), Value::from(42i64));
//! let mut root = BTreeMap::new();
//! root.insert("counters".to_string(), Value::Map(counters));
//!
//! let tree = Value::Map(root);
//! assert_eq!(tree.get(&path!("counters/visits")), Some(&Value::Integer(42)));
//! assert_eq!(tree.child("counters").map(Value::kind), Some("map"));
//! ```

mod error;
mod event;
mod path;
mod traits;
mod value;

pub use error::Error;
pub use event::{EventType, Snapshot, SubscriptionHandle};
pub use path::{Path, PathError, MAX_KEY_BYTES};
pub use traits::{EventCallback, OnceCallback, Reference};
pub use value::Value;
