//! Conversions between Value and serde types.
//!
//! Encoding builds a `Value` directly so that numbers the store cannot hold
//! are refused instead of being rounded or nulled. Decoding goes through
//! `serde_json::Value`, which has the same shape as the tree apart from
//! `Value::Bytes`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::ser::{self, Error as _, Serializer as _};
use serde::Serialize;
use typedtree_core::Value;

type Error = serde_json::Error;

/// Convert a Value to a Rust type via serde.
///
/// Errors carry serde's description of the mismatch (wrong shape, missing
/// field, wrong primitive kind). Callers add location context.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    let json = value_to_json(value);
    serde_json::from_value(json)
}

/// Convert a Rust type to a Value via serde.
///
/// Fails for integers outside the `i64` range, non-finite floats and map
/// keys that are not strings, integers or unit variants.
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, Error> {
    data.serialize(ValueSerializer)
}

/// Convert our Value to serde_json::Value.
pub fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Bytes(b) => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&b);
            serde_json::Value::String(encoded)
        }
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
///
/// JSON numbers beyond `i64` become floats.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => Value::Null,
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

fn integer<N>(n: N) -> Result<Value, Error>
where
    N: Copy + std::fmt::Display + TryInto<i64>,
{
    n.try_into()
        .map(Value::Integer)
        .map_err(|_| Error::custom(format!("integer {} is outside the store's i64 range", n)))
}

fn float(f: f64) -> Result<Value, Error> {
    if f.is_finite() {
        Ok(Value::Float(f))
    } else {
        Err(Error::custom(format!("{} cannot be stored", f)))
    }
}

fn map_key(key: Value) -> Result<String, Error> {
    match key {
        Value::String(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        other => Err(Error::custom(format!(
            "map key must be a string, found {}",
            other.kind()
        ))),
    }
}

/// Serializes straight into a `Value`, mirroring serde_json's data model.
struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantSeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantMapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::Integer(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Error> {
        integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::Integer(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Error> {
        integer(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        float(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        float(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    // Same as serde_json, so byte buffers decode back through `from_value`.
    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::Array(v.iter().map(|b| Value::Integer((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        let mut map = BTreeMap::new();
        map.insert(variant.to_string(), to_value(value)?);
        Ok(Value::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, Error> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqBuilder, Error> {
        Ok(VariantSeqBuilder {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder, Error> {
        Ok(MapBuilder::default())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<MapBuilder, Error> {
        Ok(MapBuilder::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantMapBuilder, Error> {
        Ok(VariantMapBuilder {
            variant,
            map: BTreeMap::new(),
        })
    }
}

struct SeqBuilder {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

struct VariantSeqBuilder {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for VariantSeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let mut map = BTreeMap::new();
        map.insert(self.variant.to_string(), Value::Array(self.items));
        Ok(Value::Map(map))
    }
}

#[derive(Default)]
struct MapBuilder {
    map: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        self.next_key = Some(map_key(to_value(key)?)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::custom("map value serialized before its key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Map(self.map))
    }
}

struct VariantMapBuilder {
    variant: &'static str,
    map: BTreeMap<String, Value>,
}

impl ser::SerializeStructVariant for VariantMapBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let mut outer = BTreeMap::new();
        outer.insert(self.variant.to_string(), Value::Map(self.map));
        Ok(Value::Map(outer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        celsius: f64,
        samples: u64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Status {
        Idle,
        Busy(u32),
        Moved { from: String, to: String },
    }

    #[test]
    fn integers_up_to_i64_max_are_stored_exactly() {
        assert_eq!(to_value(&i64::MAX).unwrap(), Value::Integer(i64::MAX));
        assert_eq!(to_value(&(i64::MAX as u64)).unwrap(), Value::Integer(i64::MAX));
        assert_eq!(to_value(&i64::MIN).unwrap(), Value::Integer(i64::MIN));
        assert_eq!(from_value::<u64>(Value::Integer(i64::MAX)).unwrap(), i64::MAX as u64);
    }

    #[test]
    fn integers_beyond_i64_are_refused() {
        let err = to_value(&u64::MAX).unwrap_err();
        assert!(err.to_string().contains("18446744073709551615"));
        assert!(to_value(&(i64::MAX as u64 + 1)).is_err());
        assert!(to_value(&u128::MAX).is_err());
        assert!(to_value(&i128::MIN).is_err());
        assert_eq!(to_value(&7u128).unwrap(), Value::Integer(7));
    }

    #[test]
    fn non_finite_floats_are_refused() {
        assert!(to_value(&f64::NAN).is_err());
        assert!(to_value(&f64::INFINITY).is_err());
        assert!(to_value(&f32::NEG_INFINITY).is_err());
        assert_eq!(to_value(&1.5f32).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn nested_bad_numbers_fail_the_whole_value() {
        let reading = Reading {
            sensor: "roof".to_string(),
            celsius: f64::NAN,
            samples: 3,
        };
        assert!(to_value(&reading).is_err());
        assert!(to_value(&vec![Some(1.0), Some(f64::INFINITY)]).is_err());

        let mut counts = HashMap::new();
        counts.insert("big".to_string(), u64::MAX);
        assert!(to_value(&counts).is_err());
    }

    #[test]
    fn struct_becomes_a_map_and_comes_back() {
        let reading = Reading {
            sensor: "roof".to_string(),
            celsius: 21.5,
            samples: 12,
        };
        let value = to_value(&reading).unwrap();
        assert_eq!(value.child("celsius"), Some(&Value::Float(21.5)));
        assert_eq!(value.child("samples"), Some(&Value::Integer(12)));
        assert_eq!(from_value::<Reading>(value).unwrap(), reading);
    }

    #[test]
    fn enum_variants_use_external_tagging() {
        assert_eq!(to_value(&Status::Idle).unwrap(), Value::from("Idle"));

        let busy = to_value(&Status::Busy(3)).unwrap();
        assert_eq!(busy.child("Busy"), Some(&Value::Integer(3)));

        let moved = Status::Moved {
            from: "a".to_string(),
            to: "b".to_string(),
        };
        let value = to_value(&moved).unwrap();
        assert!(matches!(value.child("Moved"), Some(Value::Map(_))));
        assert_eq!(from_value::<Status>(value).unwrap(), moved);
    }

    #[test]
    fn integer_map_keys_become_strings() {
        let mut ranks = BTreeMap::new();
        ranks.insert(1u32, "gold".to_string());
        ranks.insert(2u32, "silver".to_string());

        let value = to_value(&ranks).unwrap();
        assert_eq!(value.child("1"), Some(&Value::from("gold")));
        assert_eq!(from_value::<BTreeMap<u32, String>>(value).unwrap(), ranks);
    }

    #[test]
    fn composite_map_keys_are_refused() {
        let mut grid = BTreeMap::new();
        grid.insert((0, 0), 1);
        assert!(to_value(&grid).is_err());
    }

    #[test]
    fn absent_values_are_null() {
        assert_eq!(to_value(&Option::<i64>::None).unwrap(), Value::Null);
        assert_eq!(to_value(&()).unwrap(), Value::Null);
        assert_eq!(from_value::<Option<String>>(Value::Null).unwrap(), None);
    }

    #[test]
    fn bytes_read_back_as_base64() {
        let json = value_to_json(Value::Bytes(vec![1, 2, 3]));
        assert_eq!(json, serde_json::Value::String("AQID".to_string()));
    }

    #[test]
    fn seeded_json_numbers() {
        let seeded = json_to_value(serde_json::json!({"n": 5, "f": 0.25, "big": u64::MAX}));
        assert_eq!(seeded.child("n"), Some(&Value::Integer(5)));
        assert_eq!(seeded.child("f"), Some(&Value::Float(0.25)));
        assert!(matches!(seeded.child("big"), Some(Value::Float(_))));
    }

    #[test]
    fn shape_mismatch_names_the_problem() {
        let err = from_value::<Reading>(Value::from("roof")).unwrap_err();
        assert!(err.to_string().contains("Reading"));

        let mut partial = BTreeMap::new();
        partial.insert("sensor".to_string(), Value::from("roof"));
        let err = from_value::<Reading>(Value::Map(partial)).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }
}
