//! Value model for configuration and state
//!
//! [`Value`] is the tagged sum type every attribute value is expressed in, and
//! [`AttributeBag`] is the name → value mapping a resource instance carries.
//! Accessors return `Option` so that an attribute which was never set can be
//! told apart from one explicitly set to a zero value.

use crate::error::{ReconcileError, Result};
use crate::types::{AttributePath, Diagnostics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value represents any attribute value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null, treated the same as absent
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered, allows duplicates
    List(Vec<Value>),
    /// Unordered, equality ignores element order
    Set(Vec<Value>),
    /// String keys. Also the representation of one nested block element
    Map(BTreeMap<String, Value>),
    /// Value not yet known (during planning)
    Unknown,
}

const UNKNOWN_SENTINEL: &str = "__unknown__";

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(l) | Value::Set(l) => l.serialize(serializer),
            Value::Map(m) => m.serialize(serializer),
            Value::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid attribute value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                match i64::try_from(value) {
                    Ok(n) => Ok(Value::Int(n)),
                    Err(_) => Ok(Value::Float(value as f64)),
                }
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_SENTINEL {
                    Ok(Value::Unknown)
                } else {
                    Ok(Value::String(value.to_string()))
                }
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                if value == UNKNOWN_SENTINEL {
                    Ok(Value::Unknown)
                } else {
                    Ok(Value::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Value, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Value, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut values = BTreeMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Map(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Value {
    /// Builds a map value from string pairs (tags, labels)
    pub fn string_map(map: &BTreeMap<String, String>) -> Self {
        Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Builds a nested block list from element bags
    pub fn blocks(blocks: Vec<AttributeBag>) -> Self {
        Value::List(blocks.into_iter().map(Value::from).collect())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; whole floats are accepted since JSON does not distinguish
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Elements of a list or set
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Unknown => "unknown",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(map: BTreeMap<String, String>) -> Self {
        Value::string_map(&map)
    }
}

impl From<AttributeBag> for Value {
    fn from(bag: AttributeBag) -> Self {
        Value::Map(bag.values)
    }
}

/// Three-way reading of an attribute whose empty value is a sentinel
///
/// Several vendor APIs treat an empty string as "use the account default",
/// which is different from not sending the field at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    /// Not present in configuration
    Unset,
    /// Present but empty: use the account/vendor default
    Default,
    Explicit(T),
}

impl<T> Setting<T> {
    pub fn explicit(&self) -> Option<&T> {
        match self {
            Setting::Explicit(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Setting::Unset)
    }
}

/// Mapping from attribute name to value for one resource instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag {
    values: BTreeMap<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Present and not null
    pub fn is_set(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Sets the value only when one was returned, keeping the last-known
    /// value otherwise
    pub fn set_opt<V: Into<Value>>(&mut self, name: &str, value: Option<V>) {
        if let Some(v) = value {
            self.set(name, v);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlays every non-null value of `other` onto this bag
    pub fn overlay(&mut self, other: &AttributeBag) {
        for (name, value) in &other.values {
            if !value.is_null() {
                self.values.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.values
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.values
            .get(name)
            .filter(|v| !v.is_null() && !v.is_unknown())
    }

    fn mismatch(name: &str, expected: &str, actual: &Value) -> ReconcileError {
        ReconcileError::TypeMismatch {
            attribute: name.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Self::mismatch(name, "string", other)),
        }
    }

    /// Returns the string or a validation error naming the attribute
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name)?.ok_or_else(|| missing(name))
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => v
                .as_int()
                .map(Some)
                .ok_or_else(|| Self::mismatch(name, "int", v)),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<Option<f64>> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => v
                .as_float()
                .map(Some)
                .ok_or_else(|| Self::mismatch(name, "float", v)),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::mismatch(name, "bool", other)),
        }
    }

    pub fn get_list(&self, name: &str) -> Result<&[Value]> {
        match self.present(name) {
            None => Ok(&[]),
            Some(v) => v.as_list().ok_or_else(|| Self::mismatch(name, "list", v)),
        }
    }

    pub fn get_string_list(&self, name: &str) -> Result<Vec<String>> {
        self.get_list(name)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Self::mismatch(name, "list of string", v))
            })
            .collect()
    }

    pub fn get_string_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        match self.present(name) {
            None => Ok(BTreeMap::new()),
            Some(Value::Map(m)) => m
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(Self::mismatch(name, "map of string", other)),
                })
                .collect(),
            Some(other) => Err(Self::mismatch(name, "map", other)),
        }
    }

    /// Elements of a nested block list or set
    pub fn get_blocks(&self, name: &str) -> Result<Vec<AttributeBag>> {
        self.get_list(name)?
            .iter()
            .map(|v| match v {
                Value::Map(m) => Ok(AttributeBag::from_map(m.clone())),
                other => Err(Self::mismatch(name, "block", other)),
            })
            .collect()
    }

    /// First element of a single-item block
    pub fn get_block(&self, name: &str) -> Result<Option<AttributeBag>> {
        Ok(self.get_blocks(name)?.into_iter().next())
    }

    /// Reads a string attribute where "" means "use the default"
    pub fn setting_str(&self, name: &str) -> Result<Setting<String>> {
        match self.get_str(name)? {
            None => Ok(Setting::Unset),
            Some("") => Ok(Setting::Default),
            Some(s) => Ok(Setting::Explicit(s.to_string())),
        }
    }

    /// Encoding for the engine boundary - msgpack like Terraform's DynamicValue
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec_named(&self.values)
            .map_err(|e| ReconcileError::Encoding(format!("msgpack encoding failed: {}", e)))
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }
        rmp_serde::decode::from_slice::<BTreeMap<String, Value>>(data)
            .map(Self::from_map)
            .map_err(|e| ReconcileError::Decoding(format!("msgpack decoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.values)
            .map_err(|e| ReconcileError::Encoding(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map(Self::from_map)
            .map_err(|e| ReconcileError::Decoding(format!("json decoding failed: {}", e)))
    }
}

impl FromIterator<(String, Value)> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn missing(name: &str) -> ReconcileError {
    let mut diags = Diagnostics::new();
    diags.add_attribute_error(
        &AttributePath::new(name),
        "missing required argument",
        None::<String>,
    );
    ReconcileError::Validation(diags)
}
