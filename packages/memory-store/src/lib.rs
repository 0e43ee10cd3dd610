//! In-memory realtime tree store
//!
//! A concrete `Reference` collaborator for the typed layer:
//! - `MemoryDatabase`: one `Value` tree with realtime observers
//! - `MemoryReference`: a location in it, implementing `Reference`
//! - `PushIdGenerator`: time-ordered keys for `child_by_auto_id`
//! - `StoreConfig`: limits and dispatch mode, loadable from JSON
//!
//! # Example
//!
//! ```rust
//! use typedtree_core::{Reference, Value};
//! use typedtree_memory::MemoryDatabase;
//!
//! let db = MemoryDatabase::new();
//! let message = db.reference().child("messages").child_by_auto_id();
//! message.set_value(Value::from("hello")).unwrap();
//!
//! assert_eq!(db.snapshot(message.path()), Value::from("hello"));
//! ```

mod config;
mod database;
mod dispatch;
mod push_id;
mod reference;
mod tree;

pub use config::{DispatchMode, StoreConfig};
pub use database::MemoryDatabase;
pub use push_id::PushIdGenerator;
pub use reference::MemoryReference;
