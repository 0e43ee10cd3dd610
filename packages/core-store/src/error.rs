//! Error types for the core layer.

use crate::path::{Path, PathError};

/// Errors reported by a store collaborator.
///
/// These surface from `Reference::set_value` and are what the typed layer
/// reports as a store write failure.
#[derive(Debug)]
pub enum Error {
    /// Path validation error.
    Path(PathError),

    /// The store refused the write at this location.
    PermissionDenied { path: Path },

    /// The value cannot be stored (non-finite number, tree too deep, bad key).
    InvalidValue { path: Path, message: String },

    /// Generic error with message.
    Other { message: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Path(e) => write!(f, "path error: {}", e),
            Error::PermissionDenied { path } => {
                write!(f, "permission denied writing '{}'", path)
            }
            Error::InvalidValue { path, message } => {
                write!(f, "invalid value at '{}': {}", path, message)
            }
            Error::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Path(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Path(e)
    }
}
