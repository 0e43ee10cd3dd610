//! Errors of the typed layer.

use thiserror::Error;
use typedtree_core::Path;

/// Delivered data does not fit the type declared by the path.
///
/// Carried inside `DecodeResult::Failed`; it never aborts a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {expected} at '{path}': found {found}: {message}")]
pub struct DecodeError {
    /// Location the data was delivered for.
    pub path: Path,
    /// Rust type the path declares.
    pub expected: &'static str,
    /// Shape of the value actually found.
    pub found: &'static str,
    /// The deserializer's description of the mismatch.
    pub message: String,
}

impl DecodeError {
    pub fn new(
        path: Path,
        expected: &'static str,
        found: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            expected,
            found,
            message: message.into(),
        }
    }
}

/// A value could not be converted into the store's representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode value for '{path}': {message}")]
pub struct EncodeError {
    /// Rendered path the value was meant for.
    pub path: String,
    pub message: String,
}

/// Failure of `set_value` / `add_value`.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Encoding failed; the store was not contacted.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The store rejected or failed the write.
    #[error("store rejected write at '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: typedtree_core::Error,
    },
}

impl WriteError {
    pub fn is_encode(&self) -> bool {
        matches!(self, WriteError::Encode(_))
    }

    pub fn is_store(&self) -> bool {
        matches!(self, WriteError::Store { .. })
    }
}
