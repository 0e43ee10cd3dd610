//! The Value type - the tree stored at every location.
//!
//! Every node of the database holds a `Value`. Reads deliver the `Value` found
//! at a location; typed layers convert it to and from Rust types.

use std::collections::BTreeMap;

use crate::Path;

/// A tree-shaped value stored at a location.
///
/// Maps use `BTreeMap`, so children are always visited in key order. That
/// order is also the order child events are delivered in.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Reading a location that holds nothing yields `Null`.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data. Converted to base64 text when handed to serde.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys (the "struct" part).
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a map (struct).
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Short name of this value's shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Direct children as `(key, value)` pairs, in key order.
    ///
    /// Map entries are keyed by name, array items by their index. Leaves
    /// have no children.
    pub fn children(&self) -> Vec<(String, &Value)> {
        match self {
            Value::Map(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(arr) => arr
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// A direct child by key.
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Get a reference to a nested value by path.
    ///
    /// Returns `None` if the path doesn't exist or can't be navigated
    /// (e.g., trying to index into a string).
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for component in path.iter() {
            current = match current {
                Value::Map(map) => map.get(component)?,
                Value::Array(arr) => {
                    let index: usize = component.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use collection_literals::btree;

    #[test]
    fn get_nested_value() {
        let value = Value::Map(btree! {
            "foo".to_string() => Value::Map(btree! {
                "bar".to_string() => Value::from("hello"),
            }),
        });

        assert_eq!(value.get(&path!("foo/bar")), Some(&Value::from("hello")));
        assert!(value.get(&path!("foo")).unwrap().is_map());
        assert_eq!(value.get(&path!("nonexistent")), None);
        assert_eq!(value.get(&path!("foo/bar/baz")), None);
    }

    #[test]
    fn array_access_works() {
        let value = Value::Map(btree! {
            "items".to_string() => Value::from(vec!["a", "b", "c"]),
        });

        assert_eq!(value.get(&path!("items/0")), Some(&Value::from("a")));
        assert_eq!(value.get(&path!("items/2")), Some(&Value::from("c")));
        assert_eq!(value.get(&path!("items/3")), None);
    }

    #[test]
    fn children_in_key_order() {
        let value = Value::Map(btree! {
            "b".to_string() => Value::from(2i64),
            "a".to_string() => Value::from(1i64),
        });

        let keys: Vec<String> = value.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(value.child("b"), Some(&Value::Integer(2)));
        assert!(Value::from("leaf").children().is_empty());
    }

    #[test]
    fn array_children_are_indexed() {
        let value = Value::from(vec!["x", "y"]);
        let keys: Vec<String> = value.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["0", "1"]);
        assert_eq!(value.child("1"), Some(&Value::from("y")));
        assert_eq!(value.child("nope"), None);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1i64).kind(), "integer");
        assert_eq!(Value::from("s").kind(), "string");
        assert_eq!(Value::map().kind(), "map");
    }
}
