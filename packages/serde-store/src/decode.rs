//! Decode results: typed outcome of one delivery.

use std::any::type_name;

use serde::de::DeserializeOwned;
use typedtree_core::Snapshot;

use crate::convert::from_value;
use crate::error::DecodeError;

/// Outcome of converting delivered data into `T`.
///
/// Decoding happens inside store callbacks, where a panic or an early return
/// would be invisible to the caller, so failure is an ordinary value here.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult<T> {
    /// The data decoded as `T`.
    Ok(T),
    /// The data did not fit `T`.
    Failed(DecodeError),
}

impl<T> DecodeResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, DecodeResult::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DecodeResult::Failed(_))
    }

    /// The decoded value, discarding any error.
    pub fn ok(self) -> Option<T> {
        match self {
            DecodeResult::Ok(v) => Some(v),
            DecodeResult::Failed(_) => None,
        }
    }

    /// The error, discarding any value.
    pub fn err(self) -> Option<DecodeError> {
        match self {
            DecodeResult::Ok(_) => None,
            DecodeResult::Failed(e) => Some(e),
        }
    }

    pub fn as_ref(&self) -> DecodeResult<&T> {
        match self {
            DecodeResult::Ok(v) => DecodeResult::Ok(v),
            DecodeResult::Failed(e) => DecodeResult::Failed(e.clone()),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> DecodeResult<U> {
        match self {
            DecodeResult::Ok(v) => DecodeResult::Ok(f(v)),
            DecodeResult::Failed(e) => DecodeResult::Failed(e),
        }
    }

    pub fn into_result(self) -> Result<T, DecodeError> {
        self.into()
    }
}

impl<T> From<DecodeResult<T>> for Result<T, DecodeError> {
    fn from(result: DecodeResult<T>) -> Self {
        match result {
            DecodeResult::Ok(v) => Ok(v),
            DecodeResult::Failed(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, DecodeError>> for DecodeResult<T> {
    fn from(result: Result<T, DecodeError>) -> Self {
        match result {
            Ok(v) => DecodeResult::Ok(v),
            Err(e) => DecodeResult::Failed(e),
        }
    }
}

/// Decode one delivered snapshot as `T`.
///
/// A location holding nothing arrives as `Value::Null`, which decodes only
/// into types that accept null (`Option<_>`, `()`).
pub fn decode<T: DeserializeOwned>(snapshot: Snapshot) -> DecodeResult<T> {
    let found = snapshot.value.kind();
    match from_value::<T>(snapshot.value) {
        Ok(v) => DecodeResult::Ok(v),
        Err(e) => DecodeResult::Failed(DecodeError::new(
            snapshot.path,
            type_name::<T>(),
            found,
            e.to_string(),
        )),
    }
}
