//! Store configuration.

use serde::{Deserialize, Serialize};
use typedtree_core::{Error, MAX_KEY_BYTES};

/// Where observer callbacks run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the thread that wrote or registered, after the store's locks are
    /// released. Callbacks that write are queued behind the current one.
    #[default]
    Inline,
    /// On a dedicated dispatch thread owned by the store.
    Queued,
}

/// Limits and dispatch settings for a `MemoryDatabase`.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use typedtree_memory::{DispatchMode, StoreConfig};
///
/// let config = StoreConfig::from_json_str(r#"{"dispatch": "queued"}"#).unwrap();
/// assert_eq!(config.dispatch, DispatchMode::Queued);
/// assert_eq!(config.max_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Deepest location a write may reach, counting the path and the value's
    /// own nesting.
    pub max_depth: usize,

    /// Longest key, in UTF-8 bytes.
    pub max_key_bytes: usize,

    pub dispatch: DispatchMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_key_bytes: MAX_KEY_BYTES,
            dispatch: DispatchMode::Inline,
        }
    }
}

impl StoreConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(|e| Error::Other {
            message: format!("invalid store config: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.max_key_bytes, 768);
        assert_eq!(config.dispatch, DispatchMode::Inline);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(StoreConfig::from_json_str("{}").unwrap(), StoreConfig::default());
    }

    #[test]
    fn overrides() {
        let config =
            StoreConfig::from_json_str(r#"{"max_depth": 4, "max_key_bytes": 16}"#).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_key_bytes, 16);
    }

    #[test]
    fn invalid_document() {
        let err = StoreConfig::from_json_str(r#"{"dispatch": "sideways"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid store config"));
    }
}
