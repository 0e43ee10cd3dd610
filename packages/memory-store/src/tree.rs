//! Operations on the stored `Value` tree.
//!
//! The tree follows realtime-database rules rather than plain `Value::set`:
//! - writing `Null` removes a node
//! - a map with no children is the same as no node at all, so empty maps are
//!   pruned on the way back up
//! - writing below a leaf or an array turns it into a map

use std::collections::BTreeMap;

use typedtree_core::{Error, Path, Value};

use crate::config::StoreConfig;

/// The value at `path`, or `Null` if nothing is stored there.
pub fn read(root: &Value, path: &Path) -> Value {
    root.get(path).cloned().unwrap_or(Value::Null)
}

/// Drop `Null` map entries and collapse empty maps to `Null`.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Map(map) => {
            let map: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Map(map)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// Replace the node at `path` with `value` and return the new tree.
///
/// `value` should already be normalized.
pub fn write(root: Value, path: &Path, value: Value) -> Value {
    if value.is_null() && read(&root, path).is_null() {
        return root;
    }
    replace_at(root, &path.components, value)
}

fn replace_at(node: Value, keys: &[String], value: Value) -> Value {
    let Some((key, rest)) = keys.split_first() else {
        return value;
    };

    let mut map = into_map(node);
    let child = map.remove(key).unwrap_or_default();
    let updated = replace_at(child, rest, value);
    if !updated.is_null() {
        map.insert(key.clone(), updated);
    }

    if map.is_empty() {
        Value::Null
    } else {
        Value::Map(map)
    }
}

fn into_map(node: Value) -> BTreeMap<String, Value> {
    match node {
        Value::Map(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Check a write against the store limits before it touches the tree.
pub fn validate(path: &Path, value: &Value, config: &StoreConfig) -> Result<(), Error> {
    for key in path.iter() {
        if key.len() > config.max_key_bytes {
            return Err(Error::InvalidValue {
                path: path.clone(),
                message: format!(
                    "key is {} bytes, limit is {}",
                    key.len(),
                    config.max_key_bytes
                ),
            });
        }
    }

    let depth = path.len() + nesting(value);
    if depth > config.max_depth {
        return Err(Error::InvalidValue {
            path: path.clone(),
            message: format!(
                "write reaches depth {}, limit is {}",
                depth, config.max_depth
            ),
        });
    }

    check_value(&mut path.clone(), value, config)
}

fn nesting(value: &Value) -> usize {
    value
        .children()
        .into_iter()
        .map(|(_, child)| 1 + nesting(child))
        .max()
        .unwrap_or(0)
}

fn check_value(at: &mut Path, value: &Value, config: &StoreConfig) -> Result<(), Error> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(Error::InvalidValue {
            path: at.clone(),
            message: format!("{} cannot be stored", f),
        }),
        Value::Map(map) => {
            for (key, child) in map {
                if !Path::is_valid_key(key) || key.len() > config.max_key_bytes {
                    return Err(Error::InvalidValue {
                        path: at.clone(),
                        message: format!("'{}' is not a valid key", key),
                    });
                }
                at.components.push(key.clone());
                check_value(at, child, config)?;
                at.components.pop();
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                at.components.push(i.to_string());
                check_value(at, child, config)?;
                at.components.pop();
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;
    use typedtree_core::path;

    fn map(entries: BTreeMap<&str, Value>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn write_creates_intermediate_nodes() {
        let tree = write(Value::Null, &path!("a/b/c"), Value::from(1i64));
        assert_eq!(read(&tree, &path!("a/b/c")), Value::from(1i64));
        assert!(read(&tree, &path!("a")).is_map());
    }

    #[test]
    fn write_replaces_whole_node() {
        let tree = write(
            Value::Null,
            &path!("user"),
            map(btree! { "name" => Value::from("ada"), "age" => Value::from(36i64) }),
        );
        let tree = write(tree, &path!("user"), map(btree! { "name" => Value::from("bob") }));
        assert_eq!(read(&tree, &path!("user/age")), Value::Null);
        assert_eq!(read(&tree, &path!("user/name")), Value::from("bob"));
    }

    #[test]
    fn null_removes_and_prunes_empty_parents() {
        let tree = write(Value::Null, &path!("a/b/c"), Value::from(1i64));
        let tree = write(tree, &path!("a/x"), Value::from(2i64));

        let tree = write(tree, &path!("a/b/c"), Value::Null);
        assert_eq!(read(&tree, &path!("a/b")), Value::Null);
        assert_eq!(read(&tree, &path!("a/x")), Value::from(2i64));

        let tree = write(tree, &path!("a/x"), Value::Null);
        assert_eq!(tree, Value::Null);
    }

    #[test]
    fn removing_absent_node_leaves_tree_alone() {
        let tree = write(Value::Null, &path!("name"), Value::from("leaf"));
        let after = write(tree.clone(), &path!("name/inner"), Value::Null);
        assert_eq!(after, tree);
    }

    #[test]
    fn writing_below_leaf_replaces_it() {
        let tree = write(Value::Null, &path!("a"), Value::from("leaf"));
        let tree = write(tree, &path!("a/b"), Value::from(true));
        assert_eq!(read(&tree, &path!("a/b")), Value::from(true));
    }

    #[test]
    fn writing_into_array_keeps_items_by_index() {
        let tree = write(Value::Null, &path!("list"), Value::from(vec!["x", "y"]));
        let tree = write(tree, &path!("list/5"), Value::from("z"));
        assert_eq!(read(&tree, &path!("list/0")), Value::from("x"));
        assert_eq!(read(&tree, &path!("list/5")), Value::from("z"));
    }

    #[test]
    fn normalize_drops_nulls_and_empty_maps() {
        let value = map(btree! {
            "keep" => Value::from(1i64),
            "gone" => Value::Null,
            "empty" => Value::map(),
        });
        assert_eq!(normalize(value), map(btree! { "keep" => Value::from(1i64) }));
        assert_eq!(normalize(Value::map()), Value::Null);
        assert_eq!(normalize(Value::array()), Value::array());
    }

    #[test]
    fn validate_rejects_non_finite_floats() {
        let config = StoreConfig::default();
        let err = validate(
            &path!("stats"),
            &map(btree! { "ratio" => Value::Float(f64::NAN) }),
            &config,
        )
        .unwrap_err();
        match err {
            Error::InvalidValue { path, .. } => assert_eq!(path, path!("stats/ratio")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(validate(&path!("x"), &Value::Float(f64::INFINITY), &config).is_err());
        assert!(validate(&path!("x"), &Value::Float(1.5), &config).is_ok());
    }

    #[test]
    fn validate_rejects_bad_map_keys() {
        let config = StoreConfig::default();
        let value = map(btree! { "a.b" => Value::from(1i64) });
        assert!(matches!(
            validate(&path!("x"), &value, &config),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn validate_enforces_depth() {
        let config = StoreConfig {
            max_depth: 3,
            ..StoreConfig::default()
        };
        let nested = map(btree! { "b" => map(btree! { "c" => Value::from(1i64) }) });

        assert!(validate(&path!("a"), &nested, &config).is_ok());
        assert!(validate(&path!("a/z"), &nested, &config).is_err());
        assert!(validate(&path!("a/b/c/d"), &Value::from(1i64), &config).is_err());
    }

    #[test]
    fn validate_enforces_configured_key_length() {
        let config = StoreConfig {
            max_key_bytes: 4,
            ..StoreConfig::default()
        };
        assert!(validate(&path!("abcd"), &Value::from(1i64), &config).is_ok());
        assert!(validate(&path!("abcde"), &Value::from(1i64), &config).is_err());
    }
}
